//! relc-compiler: relational-expression-to-SQL compiler
//!
//! This crate provides the plan model, the rewrite passes that normalize a
//! plan, common sub-plan extraction into CTEs, and the formatter and
//! renderer that turn a plan into dialect-specific SQL text.

pub mod compiler;
pub mod context;
pub mod cse;
pub(crate) mod error;
pub mod formatter;
pub mod ir;
pub mod render;
pub mod rewrite;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use compiler::{compile, compile_with, Compiler};
pub use context::Context;
pub use cse::extract_ctes;
pub use error::{CompileError, CompileResult};
pub use formatter::statement::{Query, SelectStatement, SqlExpr};
pub use formatter::QueryFormatter;
pub use ir::expr::{AggFunc, BinOp, Expr, LiteralValue, SortKey, TopK, UnOp};
pub use ir::plan::{Plan, RelOp};
pub use ir::schema::{Nullability, RelSchema, TypedColumn};
pub use render::SqlRenderer;
pub use rewrite::{RewritePass, RewritePassManager, RewriteState};

pub use relc_core::{CompilerConfig, Dialect};
pub use relc_sql::{JoinKind, SetOpKind, SqlType};
