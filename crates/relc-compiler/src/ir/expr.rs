//! Typed expression tree for the plan model
//!
//! Expressions reference relations through [`Plan`] handles: a column
//! reference is bound to the plan node it reads from, and subquery variants
//! carry whole plans. Equality and hashing are structural, following the
//! plans they contain.

use super::plan::Plan;
use crate::error::{CompileError, CompileResult};
use relc_sql::SqlType;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A literal value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LiteralValue {
    /// Null literal
    Null,
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Float literal
    Float(f64),
    /// String literal
    String(String),
    /// Date literal, ISO-8601 (`2024-01-31`)
    Date(String),
    /// Timestamp literal, ISO-8601 (`2024-01-31 12:00:00`)
    Timestamp(String),
}

impl PartialEq for LiteralValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LiteralValue::Null, LiteralValue::Null) => true,
            (LiteralValue::Boolean(a), LiteralValue::Boolean(b)) => a == b,
            (LiteralValue::Integer(a), LiteralValue::Integer(b)) => a == b,
            (LiteralValue::Float(a), LiteralValue::Float(b)) => a.to_bits() == b.to_bits(),
            (LiteralValue::String(a), LiteralValue::String(b))
            | (LiteralValue::Date(a), LiteralValue::Date(b))
            | (LiteralValue::Timestamp(a), LiteralValue::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for LiteralValue {}

impl Hash for LiteralValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            LiteralValue::Null => {}
            LiteralValue::Boolean(b) => b.hash(state),
            LiteralValue::Integer(i) => i.hash(state),
            LiteralValue::Float(f) => f.to_bits().hash(state),
            LiteralValue::String(s) | LiteralValue::Date(s) | LiteralValue::Timestamp(s) => {
                s.hash(state)
            }
        }
    }
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    /// Equality (=)
    Eq,
    /// Inequality (<>)
    NotEq,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    LtEq,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    GtEq,
    /// Logical AND
    And,
    /// Logical OR
    Or,
    /// Addition (+)
    Plus,
    /// Subtraction (-)
    Minus,
    /// Multiplication (*)
    Multiply,
    /// Division (/)
    Divide,
    /// Modulo (%)
    Modulo,
    /// String concatenation (||)
    StringConcat,
    /// Pattern match (LIKE)
    Like,
    /// Negated pattern match (NOT LIKE)
    NotLike,
}

impl BinOp {
    /// Check if this is a comparison operator
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq
                | BinOp::NotEq
                | BinOp::Lt
                | BinOp::LtEq
                | BinOp::Gt
                | BinOp::GtEq
                | BinOp::Like
                | BinOp::NotLike
        )
    }

    /// Check if this is a logical operator
    pub fn is_logical(&self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Eq => write!(f, "="),
            BinOp::NotEq => write!(f, "<>"),
            BinOp::Lt => write!(f, "<"),
            BinOp::LtEq => write!(f, "<="),
            BinOp::Gt => write!(f, ">"),
            BinOp::GtEq => write!(f, ">="),
            BinOp::And => write!(f, "AND"),
            BinOp::Or => write!(f, "OR"),
            BinOp::Plus => write!(f, "+"),
            BinOp::Minus => write!(f, "-"),
            BinOp::Multiply => write!(f, "*"),
            BinOp::Divide => write!(f, "/"),
            BinOp::Modulo => write!(f, "%"),
            BinOp::StringConcat => write!(f, "||"),
            BinOp::Like => write!(f, "LIKE"),
            BinOp::NotLike => write!(f, "NOT LIKE"),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    /// Logical NOT
    Not,
    /// Arithmetic negation (-)
    Negate,
}

/// Aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    /// count(*)
    CountStar,
    /// count(x)
    Count,
    /// count(DISTINCT x)
    CountDistinct,
    /// sum(x)
    Sum,
    /// avg(x)
    Mean,
    /// min(x)
    Min,
    /// max(x)
    Max,
}

impl AggFunc {
    /// SQL function name
    pub fn sql_name(&self) -> &'static str {
        match self {
            AggFunc::CountStar | AggFunc::Count | AggFunc::CountDistinct => "count",
            AggFunc::Sum => "sum",
            AggFunc::Mean => "avg",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }

    /// Output name used when the aggregate carries no explicit alias
    pub fn default_name(&self) -> &'static str {
        match self {
            AggFunc::CountStar | AggFunc::Count => "count",
            AggFunc::CountDistinct => "nunique",
            AggFunc::Sum => "sum",
            AggFunc::Mean => "mean",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
        }
    }
}

/// Sort key for ORDER BY
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    /// Expression to sort by
    pub expr: Expr,
    /// Ascending (true) or descending (false)
    pub ascending: bool,
}

impl SortKey {
    /// Ascending key
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: true,
        }
    }

    /// Descending key
    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: false,
        }
    }
}

/// Correlated existence test: rows of `inner` matching `predicates`,
/// evaluated for each row of `outer`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExistsSubquery {
    /// Relation the test is evaluated against
    pub outer: Plan,
    /// Relation searched for a match
    pub inner: Plan,
    /// Correlation predicates, referencing both relations
    pub predicates: Vec<Expr>,
    /// NOT EXISTS
    pub negated: bool,
}

/// "Top k groups of `key` by `metric`" used as a filter predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopK {
    /// Relation the groups come from
    pub rel: Plan,
    /// Grouping key, a column of `rel`
    pub key: Expr,
    /// Named aggregate ranking the groups
    pub metric: Expr,
    /// Number of groups kept
    pub k: u64,
}

impl TopK {
    /// Name of the grouping key column
    pub fn key_name(&self) -> CompileResult<&str> {
        self.key
            .output_name()
            .ok_or_else(|| CompileError::invalid("top-k key must be a named column"))
    }

    /// The explicit `Limit(Sort(Aggregation(rel, [key], [metric]), metric DESC), k)`
    /// form of this top-k
    pub fn to_aggregation(&self) -> CompileResult<Plan> {
        let agg = self
            .rel
            .aggregate(vec![self.key.clone()], vec![self.metric.clone()])?;
        let metric_name = self
            .metric
            .output_name()
            .ok_or_else(|| CompileError::invalid("top-k metric must be named"))?;
        let ranked = agg.sort_by(vec![SortKey::desc(agg.col(metric_name)?)])?;
        ranked.limit(self.k, 0)
    }
}

/// Where a plan sits inside an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSlot {
    /// The plan is referenced (column binding, exists outer side, top-k source)
    Reference,
    /// The plan is compiled as a nested query
    Position,
}

/// Typed expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Column of the relation `rel`
    Column {
        rel: Plan,
        name: String,
        ty: SqlType,
    },
    /// All columns of `rel`
    Star { rel: Plan },
    /// Literal value with its type
    Literal { value: LiteralValue, ty: SqlType },
    /// Binary operation
    BinaryOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp { op: UnOp, expr: Box<Expr> },
    /// Scalar function call
    Function {
        name: String,
        args: Vec<Expr>,
        ty: SqlType,
    },
    /// Aggregate function call; `arg` is `None` only for `count(*)`
    Aggregate {
        func: AggFunc,
        arg: Option<Box<Expr>>,
        ty: SqlType,
    },
    /// CAST(expr AS ty)
    Cast { expr: Box<Expr>, to: SqlType },
    /// CASE expression, simple when `base` is present
    Case {
        base: Option<Box<Expr>>,
        conditions: Vec<Expr>,
        results: Vec<Expr>,
        else_result: Option<Box<Expr>>,
        ty: SqlType,
    },
    /// IS [NOT] NULL
    IsNull { expr: Box<Expr>, negated: bool },
    /// [NOT] BETWEEN
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// [NOT] IN (list)
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    /// [NOT] IN (subquery)
    InSubquery {
        expr: Box<Expr>,
        subquery: Plan,
        negated: bool,
    },
    /// Single-value subquery
    ScalarSubquery { plan: Plan },
    /// [NOT] EXISTS
    Exists(Box<ExistsSubquery>),
    /// Some row of a related relation satisfies `predicate` (none, when negated)
    Any { predicate: Box<Expr>, negated: bool },
    /// Top-k membership predicate
    TopK(Box<TopK>),
    /// Explicitly named expression
    Alias { expr: Box<Expr>, name: String },
}

impl Expr {
    fn binary(self, op: BinOp, other: Expr) -> Expr {
        Expr::BinaryOp {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }

    fn literal(value: LiteralValue, ty: SqlType) -> Expr {
        Expr::Literal { value, ty }
    }

    /// Integer literal
    pub fn lit_int(value: i64) -> Expr {
        Self::literal(LiteralValue::Integer(value), SqlType::int64())
    }

    /// Float literal
    pub fn lit_float(value: f64) -> Expr {
        Self::literal(LiteralValue::Float(value), SqlType::float64())
    }

    /// String literal
    pub fn lit_str(value: impl Into<String>) -> Expr {
        Self::literal(LiteralValue::String(value.into()), SqlType::String)
    }

    /// Boolean literal
    pub fn lit_bool(value: bool) -> Expr {
        Self::literal(LiteralValue::Boolean(value), SqlType::Boolean)
    }

    /// Date literal
    pub fn lit_date(value: impl Into<String>) -> Expr {
        Self::literal(LiteralValue::Date(value.into()), SqlType::Date)
    }

    /// Timestamp literal
    pub fn lit_timestamp(value: impl Into<String>) -> Expr {
        Self::literal(LiteralValue::Timestamp(value.into()), SqlType::Timestamp)
    }

    /// Typed NULL
    pub fn null(ty: SqlType) -> Expr {
        Self::literal(LiteralValue::Null, ty)
    }

    pub fn eq(self, other: Expr) -> Expr {
        self.binary(BinOp::Eq, other)
    }

    pub fn not_eq(self, other: Expr) -> Expr {
        self.binary(BinOp::NotEq, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        self.binary(BinOp::Lt, other)
    }

    pub fn lt_eq(self, other: Expr) -> Expr {
        self.binary(BinOp::LtEq, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        self.binary(BinOp::Gt, other)
    }

    pub fn gt_eq(self, other: Expr) -> Expr {
        self.binary(BinOp::GtEq, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        self.binary(BinOp::And, other)
    }

    pub fn or(self, other: Expr) -> Expr {
        self.binary(BinOp::Or, other)
    }

    pub fn plus(self, other: Expr) -> Expr {
        self.binary(BinOp::Plus, other)
    }

    pub fn minus(self, other: Expr) -> Expr {
        self.binary(BinOp::Minus, other)
    }

    pub fn multiply(self, other: Expr) -> Expr {
        self.binary(BinOp::Multiply, other)
    }

    pub fn divide(self, other: Expr) -> Expr {
        self.binary(BinOp::Divide, other)
    }

    pub fn concat(self, other: Expr) -> Expr {
        self.binary(BinOp::StringConcat, other)
    }

    /// SQL `LIKE` against a pattern expression
    pub fn like(self, pattern: Expr) -> Expr {
        self.binary(BinOp::Like, pattern)
    }

    pub fn not_like(self, pattern: Expr) -> Expr {
        self.binary(BinOp::NotLike, pattern)
    }

    /// Prefix match, compiled to `LIKE concat(prefix, '%')`
    pub fn startswith(self, prefix: impl Into<String>) -> Expr {
        self.like(Expr::func(
            "concat",
            vec![Expr::lit_str(prefix), Expr::lit_str("%")],
            SqlType::String,
        ))
    }

    /// Suffix match, compiled to `LIKE concat('%', suffix)`
    pub fn endswith(self, suffix: impl Into<String>) -> Expr {
        self.like(Expr::func(
            "concat",
            vec![Expr::lit_str("%"), Expr::lit_str(suffix)],
            SqlType::String,
        ))
    }

    /// Logical NOT
    pub fn not(self) -> Expr {
        Expr::UnaryOp {
            op: UnOp::Not,
            expr: Box::new(self),
        }
    }

    /// Arithmetic negation
    pub fn negate(self) -> Expr {
        Expr::UnaryOp {
            op: UnOp::Negate,
            expr: Box::new(self),
        }
    }

    /// Give the expression an explicit output name
    pub fn name(self, name: impl Into<String>) -> Expr {
        let inner = match self {
            Expr::Alias { expr, .. } => *expr,
            other => other,
        };
        Expr::Alias {
            expr: Box::new(inner),
            name: name.into(),
        }
    }

    pub fn cast(self, to: SqlType) -> Expr {
        Expr::Cast {
            expr: Box::new(self),
            to,
        }
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    pub fn not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    pub fn between(self, low: Expr, high: Expr) -> Expr {
        Expr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    pub fn isin(self, list: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }

    pub fn notin(self, list: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(self),
            list,
            negated: true,
        }
    }

    /// `self IN (subquery)`; the subquery must produce exactly one column
    pub fn isin_subquery(self, subquery: Plan) -> CompileResult<Expr> {
        if subquery.schema().len() != 1 {
            return Err(CompileError::invalid(format!(
                "IN subquery must produce one column, found {}",
                subquery.schema().len()
            )));
        }
        Ok(Expr::InSubquery {
            expr: Box::new(self),
            subquery,
            negated: false,
        })
    }

    /// Scalar function call
    pub fn func(name: impl Into<String>, args: Vec<Expr>, ty: SqlType) -> Expr {
        Expr::Function {
            name: name.into(),
            args,
            ty,
        }
    }

    /// count(*)
    pub fn count_star() -> Expr {
        Expr::Aggregate {
            func: AggFunc::CountStar,
            arg: None,
            ty: SqlType::int64(),
        }
    }

    fn aggregate(self, func: AggFunc) -> Expr {
        let ty = match func {
            AggFunc::CountStar | AggFunc::Count | AggFunc::CountDistinct => SqlType::int64(),
            AggFunc::Mean => SqlType::float64(),
            AggFunc::Sum | AggFunc::Min | AggFunc::Max => self.sql_type(),
        };
        Expr::Aggregate {
            func,
            arg: Some(Box::new(self)),
            ty,
        }
    }

    pub fn count(self) -> Expr {
        self.aggregate(AggFunc::Count)
    }

    pub fn count_distinct(self) -> Expr {
        self.aggregate(AggFunc::CountDistinct)
    }

    pub fn sum(self) -> Expr {
        self.aggregate(AggFunc::Sum)
    }

    pub fn mean(self) -> Expr {
        self.aggregate(AggFunc::Mean)
    }

    pub fn min(self) -> Expr {
        self.aggregate(AggFunc::Min)
    }

    pub fn max(self) -> Expr {
        self.aggregate(AggFunc::Max)
    }

    /// `CASE base WHEN v THEN r ... [ELSE e] END`
    pub fn simple_case(
        base: Expr,
        branches: Vec<(Expr, Expr)>,
        else_result: Option<Expr>,
    ) -> CompileResult<Expr> {
        Self::build_case(Some(base), branches, else_result)
    }

    /// `CASE WHEN cond THEN r ... [ELSE e] END`
    pub fn searched_case(
        branches: Vec<(Expr, Expr)>,
        else_result: Option<Expr>,
    ) -> CompileResult<Expr> {
        Self::build_case(None, branches, else_result)
    }

    fn build_case(
        base: Option<Expr>,
        branches: Vec<(Expr, Expr)>,
        else_result: Option<Expr>,
    ) -> CompileResult<Expr> {
        let ty = branches
            .first()
            .map(|(_, result)| result.sql_type())
            .ok_or_else(|| CompileError::invalid("CASE requires at least one branch"))?;
        let (conditions, results) = branches.into_iter().unzip();
        Ok(Expr::Case {
            base: base.map(Box::new),
            conditions,
            results,
            else_result: else_result.map(Box::new),
            ty,
        })
    }

    /// Some row of a related relation satisfies `predicate`
    pub fn any(predicate: Expr) -> Expr {
        Expr::Any {
            predicate: Box::new(predicate),
            negated: false,
        }
    }

    /// No row of a related relation satisfies `predicate`
    pub fn not_any(predicate: Expr) -> Expr {
        Expr::Any {
            predicate: Box::new(predicate),
            negated: true,
        }
    }

    /// EXISTS over `inner` correlated with `outer`
    pub fn exists(outer: &Plan, inner: &Plan, predicates: Vec<Expr>, negated: bool) -> Expr {
        Expr::Exists(Box::new(ExistsSubquery {
            outer: outer.clone(),
            inner: inner.clone(),
            predicates,
            negated,
        }))
    }

    /// Single-value subquery; the plan must produce exactly one column
    pub fn scalar_subquery(plan: Plan) -> CompileResult<Expr> {
        if plan.schema().len() != 1 {
            return Err(CompileError::invalid(format!(
                "scalar subquery must produce one column, found {}",
                plan.schema().len()
            )));
        }
        Ok(Expr::ScalarSubquery { plan })
    }

    /// Top `k` groups of this column ranked by `metric` (default `count(*)`)
    pub fn topk(self, k: u64, metric: Option<Expr>) -> CompileResult<Expr> {
        let rel = match &self {
            Expr::Column { rel, .. } => rel.clone(),
            _ => return Err(CompileError::invalid("top-k key must be a column")),
        };
        let metric = metric.unwrap_or_else(Expr::count_star);
        if metric.output_name().is_none() {
            return Err(CompileError::invalid("top-k metric must be named"));
        }
        Ok(Expr::TopK(Box::new(TopK {
            rel,
            key: self,
            metric,
            k,
        })))
    }

    /// Result type of the expression
    pub fn sql_type(&self) -> SqlType {
        match self {
            Expr::Column { ty, .. }
            | Expr::Literal { ty, .. }
            | Expr::Function { ty, .. }
            | Expr::Aggregate { ty, .. }
            | Expr::Case { ty, .. } => ty.clone(),
            Expr::Cast { to, .. } => to.clone(),
            Expr::Star { .. } => SqlType::Unknown("star".into()),
            Expr::BinaryOp { left, op, right } => {
                if op.is_comparison() || op.is_logical() {
                    SqlType::Boolean
                } else if *op == BinOp::StringConcat {
                    SqlType::String
                } else if *op == BinOp::Divide
                    || matches!(left.sql_type(), SqlType::Float { .. })
                    || matches!(right.sql_type(), SqlType::Float { .. })
                {
                    SqlType::float64()
                } else {
                    left.sql_type()
                }
            }
            Expr::UnaryOp { op: UnOp::Not, .. } => SqlType::Boolean,
            Expr::UnaryOp { expr, .. } | Expr::Alias { expr, .. } => expr.sql_type(),
            Expr::ScalarSubquery { plan } => plan
                .schema()
                .columns
                .first()
                .map(|c| c.sql_type.clone())
                .unwrap_or_else(|| SqlType::Unknown("empty subquery".into())),
            Expr::IsNull { .. }
            | Expr::Between { .. }
            | Expr::InList { .. }
            | Expr::InSubquery { .. }
            | Expr::Exists(_)
            | Expr::Any { .. }
            | Expr::TopK(_) => SqlType::Boolean,
        }
    }

    /// Output column name, when the expression has one
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Expr::Column { name, .. } | Expr::Alias { name, .. } => Some(name),
            Expr::Aggregate { func, .. } => Some(func.default_name()),
            _ => None,
        }
    }

    /// Strip a top-level alias
    pub fn unaliased(&self) -> &Expr {
        match self {
            Expr::Alias { expr, .. } => expr.unaliased(),
            other => other,
        }
    }

    /// Split a conjunction into its terms
    pub fn split_conjunction(self) -> Vec<Expr> {
        match self {
            Expr::BinaryOp {
                left,
                op: BinOp::And,
                right,
            } => {
                let mut terms = left.split_conjunction();
                terms.extend(right.split_conjunction());
                terms
            }
            other => vec![other],
        }
    }

    /// Visit this expression and every sub-expression, pre-order.
    ///
    /// Plans carried by subquery variants are not entered.
    pub fn walk(&self, f: &mut dyn FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Column { .. }
            | Expr::Star { .. }
            | Expr::Literal { .. }
            | Expr::ScalarSubquery { .. } => {}
            Expr::BinaryOp { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Expr::UnaryOp { expr, .. }
            | Expr::Cast { expr, .. }
            | Expr::IsNull { expr, .. }
            | Expr::InSubquery { expr, .. }
            | Expr::Alias { expr, .. } => expr.walk(f),
            Expr::Any { predicate, .. } => predicate.walk(f),
            Expr::Function { args, .. } => args.iter().for_each(|a| a.walk(f)),
            Expr::Aggregate { arg, .. } => {
                if let Some(arg) = arg {
                    arg.walk(f);
                }
            }
            Expr::Case {
                base,
                conditions,
                results,
                else_result,
                ..
            } => {
                if let Some(base) = base {
                    base.walk(f);
                }
                conditions.iter().for_each(|c| c.walk(f));
                results.iter().for_each(|r| r.walk(f));
                if let Some(e) = else_result {
                    e.walk(f);
                }
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.walk(f);
                low.walk(f);
                high.walk(f);
            }
            Expr::InList { expr, list, .. } => {
                expr.walk(f);
                list.iter().for_each(|e| e.walk(f));
            }
            Expr::Exists(exists) => exists.predicates.iter().for_each(|p| p.walk(f)),
            Expr::TopK(topk) => {
                topk.key.walk(f);
                topk.metric.walk(f);
            }
        }
    }

    /// Whether any sub-expression satisfies `pred`
    pub fn any_node(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        let mut found = false;
        self.walk(&mut |e| found = found || pred(e));
        found
    }

    /// Relations referenced by column and star references, in first-seen order
    pub fn referenced_relations(&self) -> Vec<Plan> {
        let mut rels: Vec<Plan> = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Column { rel, .. } | Expr::Star { rel } = e {
                if !rels.contains(rel) {
                    rels.push(rel.clone());
                }
            }
        });
        rels
    }

    /// Plans compiled as nested queries inside this expression
    pub fn subquery_plans(&self) -> Vec<Plan> {
        let mut plans = Vec::new();
        self.walk(&mut |e| match e {
            Expr::ScalarSubquery { plan } => plans.push(plan.clone()),
            Expr::InSubquery { subquery, .. } => plans.push(subquery.clone()),
            Expr::Exists(exists) => plans.push(exists.inner.clone()),
            _ => {}
        });
        plans
    }

    /// Rebuild the expression top-down.
    ///
    /// `f` is offered every node first; returning `Some` replaces the node
    /// without descending into it, `None` rebuilds it from transformed children.
    pub fn transform(
        &self,
        f: &mut dyn FnMut(&Expr) -> CompileResult<Option<Expr>>,
    ) -> CompileResult<Expr> {
        if let Some(replaced) = f(self)? {
            return Ok(replaced);
        }
        let boxed = |e: &Expr, f: &mut dyn FnMut(&Expr) -> CompileResult<Option<Expr>>| {
            e.transform(f).map(Box::new)
        };
        Ok(match self {
            Expr::Column { .. }
            | Expr::Star { .. }
            | Expr::Literal { .. }
            | Expr::ScalarSubquery { .. } => self.clone(),
            Expr::BinaryOp { left, op, right } => Expr::BinaryOp {
                left: boxed(left, f)?,
                op: *op,
                right: boxed(right, f)?,
            },
            Expr::UnaryOp { op, expr } => Expr::UnaryOp {
                op: *op,
                expr: boxed(expr, f)?,
            },
            Expr::Function { name, args, ty } => Expr::Function {
                name: name.clone(),
                args: transform_all(args, f)?,
                ty: ty.clone(),
            },
            Expr::Aggregate { func, arg, ty } => Expr::Aggregate {
                func: *func,
                arg: match arg {
                    Some(arg) => Some(boxed(arg, f)?),
                    None => None,
                },
                ty: ty.clone(),
            },
            Expr::Cast { expr, to } => Expr::Cast {
                expr: boxed(expr, f)?,
                to: to.clone(),
            },
            Expr::Case {
                base,
                conditions,
                results,
                else_result,
                ty,
            } => Expr::Case {
                base: match base {
                    Some(b) => Some(boxed(b, f)?),
                    None => None,
                },
                conditions: transform_all(conditions, f)?,
                results: transform_all(results, f)?,
                else_result: match else_result {
                    Some(e) => Some(boxed(e, f)?),
                    None => None,
                },
                ty: ty.clone(),
            },
            Expr::IsNull { expr, negated } => Expr::IsNull {
                expr: boxed(expr, f)?,
                negated: *negated,
            },
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => Expr::Between {
                expr: boxed(expr, f)?,
                low: boxed(low, f)?,
                high: boxed(high, f)?,
                negated: *negated,
            },
            Expr::InList {
                expr,
                list,
                negated,
            } => Expr::InList {
                expr: boxed(expr, f)?,
                list: transform_all(list, f)?,
                negated: *negated,
            },
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => Expr::InSubquery {
                expr: boxed(expr, f)?,
                subquery: subquery.clone(),
                negated: *negated,
            },
            Expr::Exists(exists) => Expr::Exists(Box::new(ExistsSubquery {
                outer: exists.outer.clone(),
                inner: exists.inner.clone(),
                predicates: transform_all(&exists.predicates, f)?,
                negated: exists.negated,
            })),
            Expr::Any { predicate, negated } => Expr::Any {
                predicate: boxed(predicate, f)?,
                negated: *negated,
            },
            Expr::TopK(topk) => Expr::TopK(Box::new(TopK {
                rel: topk.rel.clone(),
                key: topk.key.transform(f)?,
                metric: topk.metric.transform(f)?,
                k: topk.k,
            })),
            Expr::Alias { expr, name } => Expr::Alias {
                expr: boxed(expr, f)?,
                name: name.clone(),
            },
        })
    }

    /// Rebuild the expression with every carried plan passed through `f`
    pub fn map_plans(
        &self,
        f: &mut dyn FnMut(&Plan, PlanSlot) -> CompileResult<Plan>,
    ) -> CompileResult<Expr> {
        self.transform(&mut |e| {
            Ok(match e {
                Expr::Column { rel, name, ty } => Some(Expr::Column {
                    rel: f(rel, PlanSlot::Reference)?,
                    name: name.clone(),
                    ty: ty.clone(),
                }),
                Expr::Star { rel } => Some(Expr::Star {
                    rel: f(rel, PlanSlot::Reference)?,
                }),
                Expr::ScalarSubquery { plan } => Some(Expr::ScalarSubquery {
                    plan: f(plan, PlanSlot::Position)?,
                }),
                Expr::InSubquery {
                    expr,
                    subquery,
                    negated,
                } => Some(Expr::InSubquery {
                    expr: Box::new(expr.map_plans(&mut *f)?),
                    subquery: f(subquery, PlanSlot::Position)?,
                    negated: *negated,
                }),
                Expr::Exists(exists) => {
                    let outer = f(&exists.outer, PlanSlot::Reference)?;
                    let inner = f(&exists.inner, PlanSlot::Position)?;
                    let predicates = exists
                        .predicates
                        .iter()
                        .map(|p| p.map_plans(&mut *f))
                        .collect::<CompileResult<Vec<_>>>()?;
                    Some(Expr::Exists(Box::new(ExistsSubquery {
                        outer,
                        inner,
                        predicates,
                        negated: exists.negated,
                    })))
                }
                Expr::TopK(topk) => Some(Expr::TopK(Box::new(TopK {
                    rel: f(&topk.rel, PlanSlot::Reference)?,
                    key: topk.key.map_plans(&mut *f)?,
                    metric: topk.metric.map_plans(&mut *f)?,
                    k: topk.k,
                }))),
                _ => None,
            })
        })
    }
}

fn transform_all(
    exprs: &[Expr],
    f: &mut dyn FnMut(&Expr) -> CompileResult<Option<Expr>>,
) -> CompileResult<Vec<Expr>> {
    exprs.iter().map(|e| e.transform(f)).collect()
}

#[cfg(test)]
#[path = "expr_test.rs"]
mod tests;
