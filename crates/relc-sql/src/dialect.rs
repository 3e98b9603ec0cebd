//! SQL dialect abstraction

use relc_core::sql_utils::{escape_sql_string, is_simple_identifier, quote_ident_with};
use relc_core::Dialect as DialectKind;
use sqlparser::ast::Statement;
use sqlparser::dialect::{
    ClickHouseDialect as SqlParserClickHouse, Dialect, DuckDbDialect as SqlParserDuckDb,
    GenericDialect as SqlParserGeneric, HiveDialect as SqlParserHive,
    MySqlDialect as SqlParserMySql, PostgreSqlDialect as SqlParserPostgres,
};
use sqlparser::parser::Parser;

use crate::error::{SqlError, SqlResult};
use crate::tokens::JoinKind;
use crate::types::{FloatBitWidth, IntBitWidth, SqlType};

/// Words that are quoted in every dialect when used as identifiers.
const ANSI_RESERVED_WORDS: &[&str] = &[
    "all", "and", "any", "as", "asc", "between", "by", "case", "cast", "check", "constraint",
    "create", "cross", "default", "delete", "desc", "distinct", "drop", "else", "end", "except",
    "exists", "false", "fetch", "foreign", "from", "full", "grant", "group", "having", "in",
    "inner", "insert", "intersect", "into", "is", "join", "lateral", "left", "like", "limit",
    "natural", "not", "null", "offset", "on", "or", "order", "outer", "over", "partition",
    "primary", "references", "right", "select", "some", "table", "then", "true", "union",
    "unique", "update", "user", "using", "values", "when", "where", "window", "with",
];

/// Trait for SQL dialect implementations
///
/// Everything the renderer emits that differs between backends goes through
/// this trait: identifier quoting, join keywords, type names, literal syntax,
/// and positional `GROUP BY` support.
pub trait SqlDialect: Send + Sync {
    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Parse SQL into AST statements
    fn parse(&self, sql: &str) -> SqlResult<Vec<Statement>> {
        Parser::parse_sql(self.parser_dialect(), sql).map_err(|e| {
            let msg = e.to_string();
            let (line, column) = parse_location_from_error(&msg);
            SqlError::ParseError {
                message: msg,
                line,
                column,
            }
        })
    }

    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Identifier quote character
    fn quote_char(&self) -> char {
        '"'
    }

    /// Reserved words on top of the ANSI set
    fn extra_reserved_words(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether `ident` collides with a reserved word (case-insensitive)
    fn is_reserved(&self, ident: &str) -> bool {
        let lower = ident.to_lowercase();
        ANSI_RESERVED_WORDS.contains(&lower.as_str())
            || self.extra_reserved_words().contains(&lower.as_str())
    }

    /// Quote an identifier unconditionally
    fn quote_ident(&self, ident: &str) -> String {
        quote_ident_with(ident, self.quote_char())
    }

    /// Render an identifier, quoting it only when it is reserved or not simple
    fn ident(&self, ident: &str) -> String {
        if self.is_reserved(ident) || !is_simple_identifier(ident) {
            self.quote_ident(ident)
        } else {
            ident.to_string()
        }
    }

    /// Render a possibly schema-qualified table name
    fn table_name(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.ident(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Join keyword, or `None` when the dialect cannot express the join
    fn join_keyword(&self, kind: JoinKind) -> Option<&'static str> {
        Some(kind.ansi_keyword())
    }

    /// Type name used in `CAST` expressions
    fn type_name(&self, ty: &SqlType) -> String {
        ty.display_name()
    }

    /// Whether `GROUP BY 1, 2` ordinals are accepted
    fn supports_group_by_ordinal(&self) -> bool {
        true
    }

    /// Boolean literal
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    /// Date literal from an ISO-8601 date string
    fn date_literal(&self, value: &str) -> String {
        format!("DATE '{}'", escape_sql_string(value))
    }

    /// Timestamp literal from an ISO-8601 timestamp string
    fn timestamp_literal(&self, value: &str) -> String {
        format!("TIMESTAMP '{}'", escape_sql_string(value))
    }
}

/// Parse line and column from sqlparser error message.
///
/// sqlparser's `ParserError` carries no structured location data, so
/// "Line: N, Column: M" is extracted from the message text.
fn parse_location_from_error(msg: &str) -> (usize, usize) {
    let Some(line_idx) = msg.find("Line: ") else {
        return (0, 0);
    };
    let line_start = line_idx + 6;
    let Some(comma_idx) = msg[line_start..].find(',') else {
        return (0, 0);
    };
    let Ok(line) = msg[line_start..line_start + comma_idx]
        .trim()
        .parse::<usize>()
    else {
        return (0, 0);
    };
    let Some(col_idx) = msg.find("Column: ") else {
        return (0, 0);
    };
    let col_start = col_idx + 8;
    let col_end = msg[col_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| col_start + i)
        .unwrap_or(msg.len());
    let Ok(column) = msg[col_start..col_end].trim().parse::<usize>() else {
        return (0, 0);
    };
    (line, column)
}

/// Map a configured dialect to its implementation
pub fn dialect_for(kind: DialectKind) -> Box<dyn SqlDialect> {
    match kind {
        DialectKind::Generic => Box::new(GenericDialect::new()),
        DialectKind::DuckDb => Box::new(DuckDbDialect::new()),
        DialectKind::Postgres => Box::new(PostgresDialect::new()),
        DialectKind::Impala => Box::new(ImpalaDialect::new()),
        DialectKind::Hive => Box::new(HiveDialect::new()),
        DialectKind::MySql => Box::new(MySqlDialect::new()),
        DialectKind::ClickHouse => Box::new(ClickHouseDialect::new()),
    }
}

/// ANSI SQL dialect
pub struct GenericDialect {
    dialect: SqlParserGeneric,
}

impl GenericDialect {
    /// Create a new generic dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserGeneric {},
        }
    }
}

impl Default for GenericDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for GenericDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "generic"
    }
}

/// DuckDB SQL dialect
pub struct DuckDbDialect {
    dialect: SqlParserDuckDb,
}

impl DuckDbDialect {
    /// Create a new DuckDB dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserDuckDb {},
        }
    }
}

impl Default for DuckDbDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for DuckDbDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn join_keyword(&self, kind: JoinKind) -> Option<&'static str> {
        match kind {
            JoinKind::LeftSemi => Some("SEMI JOIN"),
            JoinKind::LeftAnti => Some("ANTI JOIN"),
            other => Some(other.ansi_keyword()),
        }
    }

    fn type_name(&self, ty: &SqlType) -> String {
        match ty {
            SqlType::Binary => "BLOB".into(),
            other => other.display_name(),
        }
    }
}

/// PostgreSQL dialect
pub struct PostgresDialect {
    dialect: SqlParserPostgres,
}

impl PostgresDialect {
    /// Create a new PostgreSQL dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserPostgres {},
        }
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for PostgresDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "postgres"
    }

    fn join_keyword(&self, kind: JoinKind) -> Option<&'static str> {
        match kind {
            JoinKind::LeftSemi | JoinKind::LeftAnti => None,
            other => Some(other.ansi_keyword()),
        }
    }

    fn type_name(&self, ty: &SqlType) -> String {
        match ty {
            SqlType::Integer {
                bits: IntBitWidth::I8,
            } => "SMALLINT".into(),
            SqlType::Float {
                bits: FloatBitWidth::F32,
            } => "REAL".into(),
            SqlType::Float {
                bits: FloatBitWidth::F64,
            } => "DOUBLE PRECISION".into(),
            SqlType::String => "TEXT".into(),
            SqlType::Binary => "BYTEA".into(),
            other => other.display_name(),
        }
    }
}

/// Lowercase Hive-family type spelling shared by Impala and Hive
fn hive_type_name(ty: &SqlType) -> String {
    match ty {
        SqlType::Integer {
            bits: IntBitWidth::I32,
        } => "int".into(),
        SqlType::String => "string".into(),
        other => other.display_name().to_lowercase(),
    }
}

/// Apache Impala dialect
pub struct ImpalaDialect {
    dialect: SqlParserHive,
}

impl ImpalaDialect {
    /// Create a new Impala dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserHive {},
        }
    }
}

impl Default for ImpalaDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for ImpalaDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "impala"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn extra_reserved_words(&self) -> &'static [&'static str] {
        &["anti", "semi", "function", "location", "replace"]
    }

    fn type_name(&self, ty: &SqlType) -> String {
        hive_type_name(ty)
    }
}

/// Apache Hive dialect
pub struct HiveDialect {
    dialect: SqlParserHive,
}

impl HiveDialect {
    /// Create a new Hive dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserHive {},
        }
    }
}

impl Default for HiveDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for HiveDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "hive"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn extra_reserved_words(&self) -> &'static [&'static str] {
        &["date", "timestamp", "function", "macro"]
    }

    fn type_name(&self, ty: &SqlType) -> String {
        hive_type_name(ty)
    }

    // Positional GROUP BY needs hive.groupby.position.alias, which is off by default.
    fn supports_group_by_ordinal(&self) -> bool {
        false
    }
}

/// MySQL dialect
pub struct MySqlDialect {
    dialect: SqlParserMySql,
}

impl MySqlDialect {
    /// Create a new MySQL dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserMySql {},
        }
    }
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for MySqlDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn extra_reserved_words(&self) -> &'static [&'static str] {
        &["key", "keys", "interval", "div", "mod", "range", "rank"]
    }

    fn join_keyword(&self, kind: JoinKind) -> Option<&'static str> {
        match kind {
            JoinKind::FullOuter | JoinKind::LeftSemi | JoinKind::LeftAnti => None,
            other => Some(other.ansi_keyword()),
        }
    }

    // CAST only accepts a restricted set of target types.
    fn type_name(&self, ty: &SqlType) -> String {
        match ty {
            SqlType::Integer { .. } | SqlType::Boolean => "SIGNED".into(),
            SqlType::String => "CHAR".into(),
            SqlType::Timestamp => "DATETIME".into(),
            SqlType::Float { .. } => "DOUBLE".into(),
            other => other.display_name(),
        }
    }
}

/// ClickHouse dialect
pub struct ClickHouseDialect {
    dialect: SqlParserClickHouse,
}

impl ClickHouseDialect {
    /// Create a new ClickHouse dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserClickHouse {},
        }
    }
}

impl Default for ClickHouseDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for ClickHouseDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn quote_char(&self) -> char {
        '`'
    }

    fn type_name(&self, ty: &SqlType) -> String {
        match ty {
            SqlType::Boolean => "Bool".into(),
            SqlType::Integer { bits } => match bits {
                IntBitWidth::I8 => "Int8".into(),
                IntBitWidth::I16 => "Int16".into(),
                IntBitWidth::I32 => "Int32".into(),
                IntBitWidth::I64 => "Int64".into(),
            },
            SqlType::Float {
                bits: FloatBitWidth::F32,
            } => "Float32".into(),
            SqlType::Float {
                bits: FloatBitWidth::F64,
            } => "Float64".into(),
            SqlType::String | SqlType::Binary => "String".into(),
            SqlType::Date => "Date".into(),
            SqlType::Timestamp => "DateTime".into(),
            other => other.display_name(),
        }
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "true"
        } else {
            "false"
        }
    }

    fn date_literal(&self, value: &str) -> String {
        format!("toDate('{}')", escape_sql_string(value))
    }

    fn timestamp_literal(&self, value: &str) -> String {
        format!("toDateTime('{}')", escape_sql_string(value))
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
