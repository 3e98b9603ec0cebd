//! Abstract SELECT statement produced by the formatter
//!
//! Column references are fully resolved: each carries its final qualifier,
//! so rendering needs no plan knowledge.

use crate::ir::expr::{BinOp, LiteralValue, UnOp};
use relc_sql::{JoinKind, SetOpKind, SqlType};

/// A complete query: CTE definitions followed by the main statement
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// CTEs in dependency order
    pub ctes: Vec<CteDefinition>,
    /// Main statement
    pub body: SelectStatement,
}

/// `name AS (body)`
#[derive(Debug, Clone, PartialEq)]
pub struct CteDefinition {
    pub name: String,
    pub body: SelectStatement,
}

/// One SELECT, optionally chained to further statements by a set operation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub select_list: Vec<SelectItem>,
    pub from: Option<FromClause>,
    pub where_: Vec<SqlExpr>,
    pub group_by: Vec<GroupKey>,
    pub having: Vec<SqlExpr>,
    pub order_by: Vec<OrderKey>,
    /// `(limit, offset)`
    pub limit: Option<(u64, u64)>,
    /// `self <kind> next`
    pub set_op: Option<(SetOpKind, Box<SelectStatement>)>,
}

impl SelectStatement {
    /// Whether ORDER BY or LIMIT would bind to a surrounding set operation
    pub fn has_ordering(&self) -> bool {
        !self.order_by.is_empty() || self.limit.is_some()
    }

    /// Append `next` at the end of this statement's set-operation chain
    pub fn chain(&mut self, kind: SetOpKind, next: SelectStatement) {
        match &mut self.set_op {
            Some((_, tail)) => tail.chain(kind, next),
            None => self.set_op = Some((kind, Box::new(next))),
        }
    }
}

/// Select-list item
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

/// `FROM base JOIN ...`
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub base: TableRef,
    pub joins: Vec<JoinClause>,
}

/// A relation in a FROM or JOIN position
#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    /// Table or CTE name with optional alias
    Named { name: String, alias: Option<String> },
    /// Parenthesized sub-select; always aliased
    Subquery {
        query: Box<SelectStatement>,
        alias: String,
    },
}

/// `<kind> relation ON predicates`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub relation: TableRef,
    pub predicates: Vec<SqlExpr>,
}

/// GROUP BY entry
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// 1-based select-list position
    Ordinal(usize),
    Expr(SqlExpr),
}

/// ORDER BY entry
#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub expr: SqlExpr,
    pub ascending: bool,
}

/// Resolved expression
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    Column {
        qualifier: Option<String>,
        name: String,
    },
    Star {
        qualifier: Option<String>,
    },
    Literal {
        value: LiteralValue,
        ty: SqlType,
    },
    Binary {
        left: Box<SqlExpr>,
        op: BinOp,
        right: Box<SqlExpr>,
    },
    Unary {
        op: UnOp,
        expr: Box<SqlExpr>,
    },
    Function {
        name: String,
        args: Vec<SqlExpr>,
        distinct: bool,
    },
    CountStar,
    Cast {
        expr: Box<SqlExpr>,
        to: SqlType,
    },
    Case {
        base: Option<Box<SqlExpr>>,
        conditions: Vec<SqlExpr>,
        results: Vec<SqlExpr>,
        else_result: Option<Box<SqlExpr>>,
        ty: SqlType,
    },
    IsNull {
        expr: Box<SqlExpr>,
        negated: bool,
    },
    Between {
        expr: Box<SqlExpr>,
        low: Box<SqlExpr>,
        high: Box<SqlExpr>,
        negated: bool,
    },
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<SqlExpr>,
        query: Box<SelectStatement>,
        negated: bool,
    },
    /// Scalar subquery
    Subquery(Box<SelectStatement>),
    Exists {
        query: Box<SelectStatement>,
        negated: bool,
    },
}

impl SqlExpr {
    /// Integer literal `1`, the select list of EXISTS subqueries
    pub fn one() -> Self {
        SqlExpr::Literal {
            value: LiteralValue::Integer(1),
            ty: SqlType::int64(),
        }
    }
}
