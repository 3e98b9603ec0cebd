//! relc-sql - SQL dialect layer for relc
//!
//! This crate owns everything that differs between SQL backends: identifier
//! quoting and reserved words, join and type spellings, literal syntax, and
//! re-parsing rendered output with sqlparser-rs.

pub mod dialect;
pub mod error;
pub mod tokens;
pub mod types;
pub mod validator;

pub use dialect::{
    dialect_for, ClickHouseDialect, DuckDbDialect, GenericDialect, HiveDialect, ImpalaDialect,
    MySqlDialect, PostgresDialect, SqlDialect,
};
pub use error::{SqlError, SqlResult};
pub use tokens::{JoinKind, SetOpKind};
pub use types::{FloatBitWidth, IntBitWidth, SqlType};
pub use validator::validate_rendered;
