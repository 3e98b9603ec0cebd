//! relc-core - Core library for relc
//!
//! This crate provides the shared error type, the compiler configuration
//! (`relc.yml`), strongly-typed name wrappers, and SQL string utilities used
//! across all relc crates.

pub mod config;
pub mod error;
pub mod names;
mod newtype_string;
pub mod sql_utils;

pub use config::{CompilerConfig, Dialect};
pub use error::{CoreError, CoreResult};
pub use names::{ColumnName, TableName};
