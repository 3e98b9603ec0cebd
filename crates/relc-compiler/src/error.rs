//! Error types for relc-compiler

use thiserror::Error;

/// Compilation error type
///
/// Every variant is raised before any SQL text is returned; compilation
/// either yields complete text or one of these.
#[derive(Error, Debug)]
pub enum CompileError {
    /// C001: A column reference is not visible from the statement it appears in
    #[error("[C001] Unresolved correlation: column '{column}' of {relation} is not visible in the current scope")]
    UnresolvedCorrelation { column: String, relation: String },

    /// C002: A column reference matches more than one joined relation
    #[error("[C002] Ambiguous reference: column '{column}' exists on both sides of {relation}")]
    AmbiguousReference { column: String, relation: String },

    /// C003: A select list produces two columns with the same name
    #[error("[C003] Duplicate output name '{name}'")]
    DuplicateOutputName { name: String },

    /// C004: The target dialect or compiler has no mapping for a construct
    #[error("[C004] Unsupported construct for dialect '{dialect}': {construct}")]
    UnsupportedConstruct { dialect: String, construct: String },

    /// C005: A plan node violates a constructor invariant
    #[error("[C005] Invalid plan: {message}")]
    InvalidPlan { message: String },

    /// C006: SQL crate error propagation
    #[error("[C006] SQL error: {0}")]
    Sql(#[from] relc_sql::SqlError),

    /// C007: Core error propagation
    #[error("[C007] Core error: {0}")]
    Core(#[from] relc_core::CoreError),
}

impl CompileError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        CompileError::InvalidPlan {
            message: message.into(),
        }
    }

    pub(crate) fn unsupported(dialect: &str, construct: impl Into<String>) -> Self {
        CompileError::UnsupportedConstruct {
            dialect: dialect.to_string(),
            construct: construct.into(),
        }
    }
}

/// Result type alias for CompileError
pub type CompileResult<T> = Result<T, CompileError>;
