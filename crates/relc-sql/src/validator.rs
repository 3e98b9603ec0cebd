//! Validation of rendered SQL by re-parsing it

use crate::dialect::SqlDialect;
use crate::error::{SqlError, SqlResult};
use sqlparser::ast::Statement;

/// Re-parse rendered SQL with the dialect's parser.
///
/// The text must parse as exactly one query statement.
pub fn validate_rendered(dialect: &dyn SqlDialect, sql: &str) -> SqlResult<()> {
    if sql.trim().is_empty() {
        return Err(SqlError::EmptySql);
    }

    let statements = dialect.parse(sql)?;
    match statements.as_slice() {
        [Statement::Query(_)] => {
            log::debug!("Rendered SQL re-parsed cleanly with the {} parser", dialect.name());
            Ok(())
        }
        [_] => Err(SqlError::ValidationError(
            "rendered SQL is not a query".to_string(),
        )),
        other => Err(SqlError::ValidationError(format!(
            "expected one statement, found {}",
            other.len()
        ))),
    }
}
