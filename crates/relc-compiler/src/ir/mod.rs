//! Plan model: relational operators, typed expressions, and schemas

pub mod expr;
pub mod plan;
pub mod schema;
