use super::*;
use std::io::Write;

#[test]
fn test_parse_empty_config_uses_defaults() {
    let config = CompilerConfig::from_yaml("{}").unwrap();
    assert_eq!(config, CompilerConfig::default());
    assert_eq!(config.dialect, Dialect::Generic);
    assert!(config.extract_ctes);
    assert_eq!(config.max_line_width, 70);
    assert!(config.passes.is_none());
    assert!(!config.validate_output);
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
dialect: impala
extract_ctes: false
max_line_width: 100
passes:
  - exists_lowering
  - filter_pushdown
validate_output: true
"#;
    let config = CompilerConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.dialect, Dialect::Impala);
    assert!(!config.extract_ctes);
    assert_eq!(config.max_line_width, 100);
    assert!(config.validate_output);
    assert!(config.pass_enabled("exists_lowering"));
    assert!(!config.pass_enabled("projection_fusion"));
}

#[test]
fn test_all_dialect_names_parse() {
    for (text, dialect) in [
        ("generic", Dialect::Generic),
        ("duckdb", Dialect::DuckDb),
        ("postgres", Dialect::Postgres),
        ("impala", Dialect::Impala),
        ("hive", Dialect::Hive),
        ("mysql", Dialect::MySql),
        ("clickhouse", Dialect::ClickHouse),
    ] {
        let config = CompilerConfig::from_yaml(&format!("dialect: {text}")).unwrap();
        assert_eq!(config.dialect, dialect);
        assert_eq!(dialect.to_string(), text);
    }
}

#[test]
fn test_unknown_field_rejected() {
    let err = CompilerConfig::from_yaml("dialekt: duckdb").unwrap_err();
    assert!(matches!(err, CoreError::ConfigParseError { .. }), "{err}");
}

#[test]
fn test_unknown_pass_rejected() {
    let err = CompilerConfig::from_yaml("passes: [constant_folding]").unwrap_err();
    match err {
        CoreError::ConfigInvalid { message } => assert!(message.contains("constant_folding")),
        other => panic!("expected ConfigInvalid, got {other}"),
    }
}

#[test]
fn test_narrow_line_width_rejected() {
    let err = CompilerConfig::from_yaml("max_line_width: 5").unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
}

#[test]
fn test_load_from_dir_prefers_yml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("relc.yml"), "dialect: hive\n").unwrap();
    std::fs::write(dir.path().join("relc.yaml"), "dialect: mysql\n").unwrap();
    let config = CompilerConfig::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.dialect, Dialect::Hive);
}

#[test]
fn test_load_from_dir_yaml_extension() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("relc.yaml")).unwrap();
    writeln!(file, "dialect: postgres").unwrap();
    let config = CompilerConfig::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.dialect, Dialect::Postgres);
}

#[test]
fn test_load_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    let err = CompilerConfig::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
    assert!(err.to_string().starts_with("[E001]"));
}
