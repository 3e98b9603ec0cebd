//! Relational plan nodes
//!
//! A [`Plan`] is a cheap, shared handle to an immutable node. Nodes are built
//! only through [`Plan::new`] (and the builder methods layered on it), which
//! computes the output schema, checks constructor invariants and caches the
//! structural hash used by equality, fusion and CTE detection.

use super::expr::{Expr, SortKey};
use super::schema::{Nullability, RelSchema, TypedColumn};
use crate::error::{CompileError, CompileResult};
use relc_core::{ColumnName, TableName};
use relc_sql::{JoinKind, SetOpKind};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static UNBOUND_TABLE_COUNTER: AtomicU64 = AtomicU64::new(0);
static SELF_REFERENCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Occurrence number of a self-reference.
///
/// Ignored by equality and hashing: two self-references of equal plans are
/// structurally equal. The formatter tells occurrences apart by handle
/// identity, and rewrites carry the number over to rebuilt nodes.
#[derive(Debug, Clone, Copy)]
pub struct Occurrence(pub u64);

impl PartialEq for Occurrence {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

impl Eq for Occurrence {}

impl Hash for Occurrence {
    fn hash<H: Hasher>(&self, _: &mut H) {}
}

/// Relational operator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelOp {
    /// Named table with a known schema
    PhysicalTable { name: TableName, schema: RelSchema },
    /// Table with a generated name, bound later by the caller
    UnboundTable { name: TableName, schema: RelSchema },
    /// Column selection and computation
    Projection { input: Plan, select_list: Vec<Expr> },
    /// Row selection; predicates are conjunctive
    Filter { input: Plan, predicates: Vec<Expr> },
    /// Grouped aggregation with optional post-aggregation predicates
    Aggregation {
        input: Plan,
        keys: Vec<Expr>,
        metrics: Vec<Expr>,
        having: Vec<Expr>,
    },
    /// Join of two relations; predicates are conjunctive
    Join {
        kind: JoinKind,
        left: Plan,
        right: Plan,
        predicates: Vec<Expr>,
    },
    /// Ordering
    Sort { input: Plan, keys: Vec<SortKey> },
    /// Row limit with offset
    Limit { input: Plan, n: u64, offset: u64 },
    /// Set operation
    SetOp {
        kind: SetOpKind,
        left: Plan,
        right: Plan,
    },
    /// Unmaterialized alias of another plan
    SelfReference { input: Plan, id: Occurrence },
}

impl RelOp {
    /// Variant name, for logging and error messages
    pub fn variant_name(&self) -> &'static str {
        match self {
            RelOp::PhysicalTable { .. } => "PhysicalTable",
            RelOp::UnboundTable { .. } => "UnboundTable",
            RelOp::Projection { .. } => "Projection",
            RelOp::Filter { .. } => "Filter",
            RelOp::Aggregation { .. } => "Aggregation",
            RelOp::Join { .. } => "Join",
            RelOp::Sort { .. } => "Sort",
            RelOp::Limit { .. } => "Limit",
            RelOp::SetOp { .. } => "SetOp",
            RelOp::SelfReference { .. } => "SelfReference",
        }
    }

    /// Child plans, left to right
    pub fn inputs(&self) -> Vec<&Plan> {
        match self {
            RelOp::PhysicalTable { .. } | RelOp::UnboundTable { .. } => vec![],
            RelOp::Projection { input, .. }
            | RelOp::Filter { input, .. }
            | RelOp::Aggregation { input, .. }
            | RelOp::Sort { input, .. }
            | RelOp::Limit { input, .. }
            | RelOp::SelfReference { input, .. } => vec![input],
            RelOp::Join { left, right, .. } | RelOp::SetOp { left, right, .. } => {
                vec![left, right]
            }
        }
    }

    /// Expressions carried directly by this node
    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            RelOp::Projection { select_list, .. } => select_list.iter().collect(),
            RelOp::Filter { predicates, .. } | RelOp::Join { predicates, .. } => {
                predicates.iter().collect()
            }
            RelOp::Aggregation {
                keys,
                metrics,
                having,
                ..
            } => keys.iter().chain(metrics).chain(having).collect(),
            RelOp::Sort { keys, .. } => keys.iter().map(|k| &k.expr).collect(),
            _ => vec![],
        }
    }

    /// Same operator over different child plans
    pub fn with_inputs(&self, inputs: Vec<Plan>) -> CompileResult<RelOp> {
        let expected = self.inputs().len();
        if inputs.len() != expected {
            return Err(CompileError::invalid(format!(
                "{} takes {} inputs, got {}",
                self.variant_name(),
                expected,
                inputs.len()
            )));
        }
        let mut inputs = inputs.into_iter();
        let mut next = || {
            inputs
                .next()
                .ok_or_else(|| CompileError::invalid("missing plan input"))
        };
        Ok(match self {
            RelOp::PhysicalTable { .. } | RelOp::UnboundTable { .. } => self.clone(),
            RelOp::Projection { select_list, .. } => RelOp::Projection {
                input: next()?,
                select_list: select_list.clone(),
            },
            RelOp::Filter { predicates, .. } => RelOp::Filter {
                input: next()?,
                predicates: predicates.clone(),
            },
            RelOp::Aggregation {
                keys,
                metrics,
                having,
                ..
            } => RelOp::Aggregation {
                input: next()?,
                keys: keys.clone(),
                metrics: metrics.clone(),
                having: having.clone(),
            },
            RelOp::Join {
                kind, predicates, ..
            } => RelOp::Join {
                kind: *kind,
                left: next()?,
                right: next()?,
                predicates: predicates.clone(),
            },
            RelOp::Sort { keys, .. } => RelOp::Sort {
                input: next()?,
                keys: keys.clone(),
            },
            RelOp::Limit { n, offset, .. } => RelOp::Limit {
                input: next()?,
                n: *n,
                offset: *offset,
            },
            RelOp::SetOp { kind, .. } => RelOp::SetOp {
                kind: *kind,
                left: next()?,
                right: next()?,
            },
            RelOp::SelfReference { id, .. } => RelOp::SelfReference {
                input: next()?,
                id: *id,
            },
        })
    }

    /// Same operator with every carried expression passed through `f`
    pub fn map_expressions(
        &self,
        f: &mut dyn FnMut(&Expr) -> CompileResult<Expr>,
    ) -> CompileResult<RelOp> {
        let all = |exprs: &[Expr], f: &mut dyn FnMut(&Expr) -> CompileResult<Expr>| {
            exprs.iter().map(|e| f(e)).collect::<CompileResult<Vec<_>>>()
        };
        Ok(match self {
            RelOp::Projection { input, select_list } => RelOp::Projection {
                input: input.clone(),
                select_list: all(select_list, f)?,
            },
            RelOp::Filter { input, predicates } => RelOp::Filter {
                input: input.clone(),
                predicates: all(predicates, f)?,
            },
            RelOp::Aggregation {
                input,
                keys,
                metrics,
                having,
            } => RelOp::Aggregation {
                input: input.clone(),
                keys: all(keys, f)?,
                metrics: all(metrics, f)?,
                having: all(having, f)?,
            },
            RelOp::Join {
                kind,
                left,
                right,
                predicates,
            } => RelOp::Join {
                kind: *kind,
                left: left.clone(),
                right: right.clone(),
                predicates: all(predicates, f)?,
            },
            RelOp::Sort { input, keys } => RelOp::Sort {
                input: input.clone(),
                keys: keys
                    .iter()
                    .map(|k| {
                        Ok(SortKey {
                            expr: f(&k.expr)?,
                            ascending: k.ascending,
                        })
                    })
                    .collect::<CompileResult<Vec<_>>>()?,
            },
            other => other.clone(),
        })
    }
}

struct PlanNode {
    op: RelOp,
    schema: RelSchema,
    hash: u64,
}

/// Shared handle to an immutable plan node
#[derive(Clone)]
pub struct Plan(Arc<PlanNode>);

impl Plan {
    /// Build a node, computing its schema and checking its invariants
    pub fn new(op: RelOp) -> CompileResult<Plan> {
        let schema = derive_schema(&op)?;
        let mut hasher = DefaultHasher::new();
        op.hash(&mut hasher);
        let hash = hasher.finish();
        Ok(Plan(Arc::new(PlanNode { op, schema, hash })))
    }

    /// Physical table
    pub fn table(name: &str, schema: RelSchema) -> CompileResult<Plan> {
        Plan::new(RelOp::PhysicalTable {
            name: TableName::new(name)?,
            schema,
        })
    }

    /// Table with a generated, process-unique name
    pub fn unbound_table(schema: RelSchema) -> CompileResult<Plan> {
        let n = UNBOUND_TABLE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Plan::new(RelOp::UnboundTable {
            name: TableName::new(format!("unbound_table_{}", n))?,
            schema,
        })
    }

    /// The operator of this node
    pub fn op(&self) -> &RelOp {
        &self.0.op
    }

    /// Output schema
    pub fn schema(&self) -> &RelSchema {
        &self.0.schema
    }

    /// Cached structural hash
    pub fn structural_hash(&self) -> u64 {
        self.0.hash
    }

    /// Whether both handles point at the same node object
    pub fn ptr_eq(&self, other: &Plan) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Occurrence number when this node is a self-reference
    pub fn occurrence(&self) -> Option<u64> {
        match self.op() {
            RelOp::SelfReference { id, .. } => Some(id.0),
            _ => None,
        }
    }

    /// Whether this is a bare physical or unbound table
    pub fn is_table(&self) -> bool {
        matches!(
            self.op(),
            RelOp::PhysicalTable { .. } | RelOp::UnboundTable { .. }
        )
    }

    /// Reference to an output column
    pub fn col(&self, name: &str) -> CompileResult<Expr> {
        let column = self.schema().find_column(name).ok_or_else(|| {
            CompileError::invalid(format!(
                "{} has no column '{}'",
                self.op().variant_name(),
                name
            ))
        })?;
        Ok(Expr::Column {
            rel: self.clone(),
            name: name.to_string(),
            ty: column.sql_type.clone(),
        })
    }

    /// All columns of this relation
    pub fn star(&self) -> Expr {
        Expr::Star { rel: self.clone() }
    }

    pub fn project(&self, select_list: Vec<Expr>) -> CompileResult<Plan> {
        Plan::new(RelOp::Projection {
            input: self.clone(),
            select_list,
        })
    }

    pub fn filter(&self, predicates: Vec<Expr>) -> CompileResult<Plan> {
        Plan::new(RelOp::Filter {
            input: self.clone(),
            predicates,
        })
    }

    pub fn aggregate(&self, keys: Vec<Expr>, metrics: Vec<Expr>) -> CompileResult<Plan> {
        self.aggregate_having(keys, metrics, vec![])
    }

    pub fn aggregate_having(
        &self,
        keys: Vec<Expr>,
        metrics: Vec<Expr>,
        having: Vec<Expr>,
    ) -> CompileResult<Plan> {
        Plan::new(RelOp::Aggregation {
            input: self.clone(),
            keys,
            metrics,
            having,
        })
    }

    /// `count(*)` of this relation as a one-row relation
    pub fn count(&self) -> CompileResult<Plan> {
        self.aggregate(vec![], vec![Expr::count_star()])
    }

    /// Scalar subquery reducing this relation to a single aggregate value
    pub fn reduce(&self, metric: Expr) -> CompileResult<Expr> {
        Expr::scalar_subquery(self.aggregate(vec![], vec![metric])?)
    }

    pub fn join(&self, kind: JoinKind, right: &Plan, predicates: Vec<Expr>) -> CompileResult<Plan> {
        Plan::new(RelOp::Join {
            kind,
            left: self.clone(),
            right: right.clone(),
            predicates,
        })
    }

    pub fn inner_join(&self, right: &Plan, predicates: Vec<Expr>) -> CompileResult<Plan> {
        self.join(JoinKind::Inner, right, predicates)
    }

    pub fn left_join(&self, right: &Plan, predicates: Vec<Expr>) -> CompileResult<Plan> {
        self.join(JoinKind::LeftOuter, right, predicates)
    }

    pub fn outer_join(&self, right: &Plan, predicates: Vec<Expr>) -> CompileResult<Plan> {
        self.join(JoinKind::FullOuter, right, predicates)
    }

    pub fn semi_join(&self, right: &Plan, predicates: Vec<Expr>) -> CompileResult<Plan> {
        self.join(JoinKind::LeftSemi, right, predicates)
    }

    pub fn anti_join(&self, right: &Plan, predicates: Vec<Expr>) -> CompileResult<Plan> {
        self.join(JoinKind::LeftAnti, right, predicates)
    }

    pub fn cross_join(&self, right: &Plan) -> CompileResult<Plan> {
        self.join(JoinKind::Cross, right, vec![])
    }

    pub fn sort_by(&self, keys: Vec<SortKey>) -> CompileResult<Plan> {
        Plan::new(RelOp::Sort {
            input: self.clone(),
            keys,
        })
    }

    pub fn limit(&self, n: u64, offset: u64) -> CompileResult<Plan> {
        Plan::new(RelOp::Limit {
            input: self.clone(),
            n,
            offset,
        })
    }

    pub fn set_op(&self, kind: SetOpKind, right: &Plan) -> CompileResult<Plan> {
        Plan::new(RelOp::SetOp {
            kind,
            left: self.clone(),
            right: right.clone(),
        })
    }

    pub fn union(&self, right: &Plan) -> CompileResult<Plan> {
        self.set_op(SetOpKind::Union, right)
    }

    pub fn union_all(&self, right: &Plan) -> CompileResult<Plan> {
        self.set_op(SetOpKind::UnionAll, right)
    }

    pub fn intersect(&self, right: &Plan) -> CompileResult<Plan> {
        self.set_op(SetOpKind::Intersect, right)
    }

    pub fn except(&self, right: &Plan) -> CompileResult<Plan> {
        self.set_op(SetOpKind::Except, right)
    }

    /// A distinct occurrence of this plan, used to join a plan to itself
    pub fn view(&self) -> Plan {
        let id = Occurrence(SELF_REFERENCE_COUNTER.fetch_add(1, Ordering::Relaxed));
        let op = RelOp::SelfReference {
            input: self.clone(),
            id,
        };
        let mut hasher = DefaultHasher::new();
        op.hash(&mut hasher);
        Plan(Arc::new(PlanNode {
            schema: self.schema().clone(),
            hash: hasher.finish(),
            op,
        }))
    }
}

impl PartialEq for Plan {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.0.hash == other.0.hash && self.0.op == other.0.op)
    }
}

impl Eq for Plan {}

impl Hash for Plan {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl std::fmt::Debug for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.op() {
            RelOp::PhysicalTable { name, .. } | RelOp::UnboundTable { name, .. } => {
                write!(f, "{}({})", self.op().variant_name(), name)
            }
            op => write!(f, "{}#{:016x}", op.variant_name(), self.0.hash),
        }
    }
}

/// Output schema of `op`, enforcing constructor invariants
fn derive_schema(op: &RelOp) -> CompileResult<RelSchema> {
    match op {
        RelOp::PhysicalTable { schema, .. } | RelOp::UnboundTable { schema, .. } => {
            Ok(schema.clone())
        }
        RelOp::Projection { select_list, .. } => {
            if select_list.is_empty() {
                return Err(CompileError::invalid("projection has an empty select list"));
            }
            let mut columns = Vec::new();
            for item in select_list {
                match item {
                    Expr::Star { rel } => columns.extend(rel.schema().columns.iter().cloned()),
                    other => columns.push(named_column(other, "projection")?),
                }
            }
            unique_schema(columns)
        }
        RelOp::Filter { input, predicates } => {
            if predicates.is_empty() {
                return Err(CompileError::invalid("filter has no predicates"));
            }
            Ok(input.schema().clone())
        }
        RelOp::Aggregation { keys, metrics, .. } => {
            if keys.is_empty() && metrics.is_empty() {
                return Err(CompileError::invalid(
                    "aggregation needs at least one key or metric",
                ));
            }
            let columns = keys
                .iter()
                .map(|k| named_column(k, "grouping key"))
                .chain(metrics.iter().map(|m| named_column(m, "metric")))
                .collect::<CompileResult<Vec<_>>>()?;
            unique_schema(columns)
        }
        RelOp::Join {
            kind,
            left,
            right,
            predicates,
        } => {
            if *kind == JoinKind::Cross && !predicates.is_empty() {
                return Err(CompileError::invalid("cross join takes no predicates"));
            }
            if *kind != JoinKind::Cross && predicates.is_empty() {
                return Err(CompileError::invalid(format!(
                    "{} join needs at least one predicate",
                    kind
                )));
            }
            Ok(match kind {
                JoinKind::Inner | JoinKind::Cross => {
                    RelSchema::merge(left.schema(), right.schema())
                }
                JoinKind::LeftOuter => RelSchema::merge(
                    left.schema(),
                    &right.schema().with_nullability(Nullability::Nullable),
                ),
                JoinKind::FullOuter => RelSchema::merge(
                    &left.schema().with_nullability(Nullability::Nullable),
                    &right.schema().with_nullability(Nullability::Nullable),
                ),
                JoinKind::LeftSemi | JoinKind::LeftAnti => left.schema().clone(),
            })
        }
        RelOp::Sort { input, keys } => {
            if keys.is_empty() {
                return Err(CompileError::invalid("sort has no keys"));
            }
            Ok(input.schema().clone())
        }
        RelOp::Limit { input, .. } | RelOp::SelfReference { input, .. } => {
            Ok(input.schema().clone())
        }
        RelOp::SetOp { kind, left, right } => {
            if left.schema().len() != right.schema().len() {
                return Err(CompileError::invalid(format!(
                    "{} sides have {} and {} columns",
                    kind.keyword(),
                    left.schema().len(),
                    right.schema().len()
                )));
            }
            Ok(left.schema().clone())
        }
    }
}

fn named_column(expr: &Expr, role: &str) -> CompileResult<TypedColumn> {
    let name = expr
        .output_name()
        .ok_or_else(|| CompileError::invalid(format!("{} expression needs a name", role)))?;
    Ok(TypedColumn::new(ColumnName::new(name)?, expr.sql_type()))
}

fn unique_schema(columns: Vec<TypedColumn>) -> CompileResult<RelSchema> {
    let schema = RelSchema::new(columns);
    if let Some(name) = schema.first_duplicate() {
        return Err(CompileError::DuplicateOutputName {
            name: name.to_string(),
        });
    }
    Ok(schema)
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
