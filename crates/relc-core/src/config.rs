//! Compiler configuration parsed from relc.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Names of the built-in rewrite passes, in execution order.
pub const KNOWN_PASSES: &[&str] = &[
    "exists_lowering",
    "topk_decomposition",
    "filter_pushdown",
    "projection_fusion",
];

const MIN_LINE_WIDTH: usize = 20;

/// Compiler configuration from relc.yml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Target SQL dialect
    #[serde(default)]
    pub dialect: Dialect,

    /// Factor repeated sub-plans into CTEs
    #[serde(default = "default_true")]
    pub extract_ctes: bool,

    /// Width at which the select list wraps onto continuation lines
    #[serde(default = "default_max_line_width")]
    pub max_line_width: usize,

    /// Rewrite passes to run (all when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passes: Option<Vec<String>>,

    /// Re-parse rendered SQL with sqlparser before returning it
    #[serde(default)]
    pub validate_output: bool,
}

/// SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// ANSI SQL with double-quoted identifiers
    #[default]
    Generic,
    /// DuckDB
    DuckDb,
    /// PostgreSQL
    Postgres,
    /// Apache Impala
    Impala,
    /// Apache Hive
    Hive,
    /// MySQL
    MySql,
    /// ClickHouse
    ClickHouse,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Generic => write!(f, "generic"),
            Dialect::DuckDb => write!(f, "duckdb"),
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::Impala => write!(f, "impala"),
            Dialect::Hive => write!(f, "hive"),
            Dialect::MySql => write!(f, "mysql"),
            Dialect::ClickHouse => write!(f, "clickhouse"),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_line_width() -> usize {
    70
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            extract_ctes: true,
            max_line_width: default_max_line_width(),
            passes: None,
            validate_output: false,
        }
    }
}

impl CompilerConfig {
    /// Configuration targeting `dialect` with every other key at its default
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        log::debug!("Loading compiler config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a directory
    /// Looks for relc.yml or relc.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("relc.yml");
        let yaml_path = dir.join("relc.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> CoreResult<Self> {
        let config: CompilerConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_line_width < MIN_LINE_WIDTH {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "max_line_width must be at least {MIN_LINE_WIDTH}, got {}",
                    self.max_line_width
                ),
            });
        }

        if let Some(passes) = &self.passes {
            for name in passes {
                if !KNOWN_PASSES.contains(&name.as_str()) {
                    return Err(CoreError::ConfigInvalid {
                        message: format!(
                            "Unknown rewrite pass '{}' in passes. Valid passes: {}",
                            name,
                            KNOWN_PASSES.join(", ")
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    /// Whether the named rewrite pass is enabled
    pub fn pass_enabled(&self, name: &str) -> bool {
        match &self.passes {
            Some(passes) => passes.iter().any(|p| p == name),
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
