use super::*;

#[test]
fn test_generic_parse() {
    let dialect = GenericDialect::new();
    let stmts = dialect.parse("SELECT *\nFROM star1").unwrap();
    assert_eq!(stmts.len(), 1);
}

#[test]
fn test_ident_quoting_rules() {
    let dialect = GenericDialect::new();
    assert_eq!(dialect.ident("foo_id"), "foo_id");
    assert_eq!(dialect.ident("else"), "\"else\"");
    assert_eq!(dialect.ident("ELSE"), "\"ELSE\"");
    assert_eq!(dialect.ident("my col"), "\"my col\"");
    assert_eq!(dialect.ident("1st"), "\"1st\"");
    assert_eq!(dialect.ident("we\"ird"), "\"we\"\"ird\"");
}

#[test]
fn test_backtick_dialects() {
    for kind in [
        DialectKind::Impala,
        DialectKind::Hive,
        DialectKind::MySql,
        DialectKind::ClickHouse,
    ] {
        let dialect = dialect_for(kind);
        assert_eq!(dialect.ident("select"), "`select`", "{}", dialect.name());
        assert_eq!(dialect.quote_ident("a`b"), "`a``b`");
    }
}

#[test]
fn test_dialect_specific_reserved_words() {
    assert_eq!(MySqlDialect::new().ident("key"), "`key`");
    assert_eq!(GenericDialect::new().ident("key"), "key");
}

#[test]
fn test_qualified_table_name() {
    let dialect = GenericDialect::new();
    assert_eq!(dialect.table_name("staging.orders"), "staging.orders");
    assert_eq!(dialect.table_name("staging.order"), "staging.\"order\"");
}

#[test]
fn test_join_keywords() {
    let generic = GenericDialect::new();
    assert_eq!(generic.join_keyword(JoinKind::LeftSemi), Some("LEFT SEMI JOIN"));
    assert_eq!(generic.join_keyword(JoinKind::Cross), Some("CROSS JOIN"));

    let postgres = PostgresDialect::new();
    assert_eq!(postgres.join_keyword(JoinKind::LeftAnti), None);
    assert_eq!(postgres.join_keyword(JoinKind::FullOuter), Some("FULL OUTER JOIN"));

    let mysql = MySqlDialect::new();
    assert_eq!(mysql.join_keyword(JoinKind::FullOuter), None);

    let duckdb = DuckDbDialect::new();
    assert_eq!(duckdb.join_keyword(JoinKind::LeftSemi), Some("SEMI JOIN"));
}

#[test]
fn test_type_names() {
    assert_eq!(GenericDialect::new().type_name(&SqlType::String), "VARCHAR");
    assert_eq!(ImpalaDialect::new().type_name(&SqlType::String), "string");
    assert_eq!(HiveDialect::new().type_name(&SqlType::float64()), "double");
    assert_eq!(PostgresDialect::new().type_name(&SqlType::float64()), "DOUBLE PRECISION");
    assert_eq!(ClickHouseDialect::new().type_name(&SqlType::int64()), "Int64");
    assert_eq!(MySqlDialect::new().type_name(&SqlType::String), "CHAR");
}

#[test]
fn test_literals() {
    let generic = GenericDialect::new();
    assert_eq!(generic.date_literal("2024-01-01"), "DATE '2024-01-01'");
    assert_eq!(generic.boolean_literal(true), "TRUE");
    let clickhouse = ClickHouseDialect::new();
    assert_eq!(clickhouse.timestamp_literal("2024-01-01 00:00:00"), "toDateTime('2024-01-01 00:00:00')");
}

#[test]
fn test_group_by_ordinal_support() {
    assert!(GenericDialect::new().supports_group_by_ordinal());
    assert!(!HiveDialect::new().supports_group_by_ordinal());
}

#[test]
fn test_dialect_for_names() {
    for (kind, name) in [
        (DialectKind::Generic, "generic"),
        (DialectKind::DuckDb, "duckdb"),
        (DialectKind::Postgres, "postgres"),
        (DialectKind::Impala, "impala"),
        (DialectKind::Hive, "hive"),
        (DialectKind::MySql, "mysql"),
        (DialectKind::ClickHouse, "clickhouse"),
    ] {
        assert_eq!(dialect_for(kind).name(), name);
        assert_eq!(kind.to_string(), name);
    }
}

#[test]
fn test_parse_error_location() {
    let dialect = DuckDbDialect::new();
    let result = dialect.parse("SELECT\nFROM users");
    match result {
        Err(SqlError::ParseError { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected ParseError, got {other:?}"),
    }
}

#[test]
fn test_parse_location_from_error_without_location() {
    assert_eq!(parse_location_from_error("unexpected token"), (0, 0));
    assert_eq!(
        parse_location_from_error("Expected: an expression, found: FROM at Line: 3, Column: 7"),
        (3, 7)
    );
}
