//! Collapsing a plan fragment into the clause slots of one SELECT

use crate::error::CompileResult;
use crate::ir::expr::{Expr, SortKey};
use crate::ir::plan::{Plan, RelOp};
use relc_sql::JoinKind;

const LIMIT: u8 = 5;
const ORDER_BY: u8 = 4;
const SELECT: u8 = 3;
const WHERE: u8 = 2;
const NONE: u8 = u8::MAX;

/// The unary nodes of a plan absorbed into one statement, outermost first
#[derive(Debug, Clone)]
pub(crate) struct Chain {
    /// Outermost limit and offset
    pub limit: Option<(u64, u64)>,
    /// Sort keys, outer sort first
    pub order_by: Vec<SortKey>,
    /// Projection or aggregation providing the select list
    pub select: Option<Plan>,
    /// Filter predicates, innermost filter first
    pub predicates: Vec<Expr>,
    /// Limit, sort, filter and self-reference nodes folded into the statement
    pub absorbed: Vec<Plan>,
    /// Remaining plan, placed in `FROM`
    pub from: Plan,
}

impl Chain {
    /// Walk down from `root` absorbing nodes while each one belongs to a
    /// strictly earlier clause than the last, stopping at CTE references.
    ///
    /// Chained filters, sorts and limits merge; the outermost limit wins.
    pub fn collapse(root: &Plan, is_cte_ref: &dyn Fn(&Plan) -> bool) -> Chain {
        let mut chain = Chain {
            limit: None,
            order_by: Vec::new(),
            select: None,
            predicates: Vec::new(),
            absorbed: Vec::new(),
            from: root.clone(),
        };
        let mut node = root.clone();
        let mut last = NONE;
        while !is_cte_ref(&node) {
            let next = match node.op() {
                RelOp::Limit { input, n, offset } if last >= LIMIT => {
                    if chain.limit.is_none() {
                        chain.limit = Some((*n, *offset));
                    }
                    last = LIMIT;
                    chain.absorbed.push(node.clone());
                    input.clone()
                }
                RelOp::Sort { input, keys } if last >= ORDER_BY => {
                    chain.order_by.extend(keys.iter().cloned());
                    last = ORDER_BY;
                    chain.absorbed.push(node.clone());
                    input.clone()
                }
                RelOp::Projection { input, .. } | RelOp::Aggregation { input, .. }
                    if last > SELECT =>
                {
                    chain.select = Some(node.clone());
                    last = SELECT;
                    input.clone()
                }
                RelOp::Filter { input, predicates } if last >= WHERE => {
                    chain.predicates.splice(0..0, predicates.iter().cloned());
                    last = WHERE;
                    chain.absorbed.push(node.clone());
                    input.clone()
                }
                RelOp::SelfReference { input, .. } if last == NONE => {
                    chain.absorbed.push(node.clone());
                    input.clone()
                }
                _ => break,
            };
            node = next;
        }
        chain.from = node;
        chain
    }

    /// Whether the statement carries ORDER BY or LIMIT
    pub fn has_ordering(&self) -> bool {
        self.limit.is_some() || !self.order_by.is_empty()
    }

    /// Every expression the statement will render
    pub fn expressions(&self, from: &FromRelations) -> Vec<Expr> {
        let mut exprs: Vec<Expr> = Vec::new();
        if let Some(select) = &self.select {
            exprs.extend(select.op().expressions().into_iter().cloned());
        }
        exprs.extend(self.predicates.iter().cloned());
        for (_, predicates) in &from.joins {
            exprs.extend(predicates.iter().cloned());
        }
        exprs.extend(self.order_by.iter().map(|k| k.expr.clone()));
        exprs
    }
}

/// Left-deep join chain flattened into `FROM` order
#[derive(Debug, Clone)]
pub(crate) struct FromRelations {
    /// Relations in `FROM`/`JOIN` order
    pub relations: Vec<Plan>,
    /// Join kind and predicates for `relations[i + 1]`
    pub joins: Vec<(JoinKind, Vec<Expr>)>,
    /// Join nodes folded into the list
    pub join_nodes: Vec<Plan>,
}

impl FromRelations {
    pub fn flatten(from: &Plan, is_cte_ref: &dyn Fn(&Plan) -> bool) -> FromRelations {
        let mut out = FromRelations {
            relations: Vec::new(),
            joins: Vec::new(),
            join_nodes: Vec::new(),
        };
        out.push(from, is_cte_ref);
        out
    }

    fn push(&mut self, node: &Plan, is_cte_ref: &dyn Fn(&Plan) -> bool) {
        if !is_cte_ref(node) {
            if let RelOp::Join {
                kind,
                left,
                right,
                predicates,
            } = node.op()
            {
                self.push(left, is_cte_ref);
                self.relations.push(right.clone());
                self.joins.push((*kind, predicates.clone()));
                self.join_nodes.push(node.clone());
                return;
            }
        }
        self.relations.push(node.clone());
    }

    /// Whether every joined relation contributes its columns
    pub fn exposes_all(&self) -> bool {
        self.joins.iter().all(|(kind, _)| kind.exposes_right())
    }
}

/// The plan a relation occupying a `FROM` position stands for
pub(crate) fn position_of(relation: &Plan) -> &Plan {
    match relation.op() {
        RelOp::SelfReference { input, .. } => position_of(input),
        _ => relation,
    }
}

/// Plans `plan` places into relation positions when formatted as a
/// statement: `FROM`/`JOIN` relations, set-operation sides and nested
/// subqueries of its expressions
pub(crate) fn statement_positions(
    plan: &Plan,
    is_cte_ref: &dyn Fn(&Plan) -> bool,
) -> CompileResult<Vec<Plan>> {
    let mut out = Vec::new();
    if !is_cte_ref(plan) {
        if let RelOp::SetOp { kind, left, right } = plan.op() {
            match left.op() {
                RelOp::SetOp { kind: k, .. } if k == kind && !is_cte_ref(left) => {
                    out.extend(statement_positions(left, is_cte_ref)?)
                }
                _ => out.push(left.clone()),
            }
            out.push(right.clone());
            return Ok(out);
        }
    }

    let chain = Chain::collapse(plan, is_cte_ref);
    let from = FromRelations::flatten(&chain.from, is_cte_ref);
    out.extend(from.relations.iter().map(|r| position_of(r).clone()));
    for expr in chain.expressions(&from) {
        expression_positions(&expr, is_cte_ref, &mut out)?;
    }
    Ok(out)
}

fn expression_positions(
    expr: &Expr,
    is_cte_ref: &dyn Fn(&Plan) -> bool,
    out: &mut Vec<Plan>,
) -> CompileResult<()> {
    let mut found: Vec<Expr> = Vec::new();
    expr.walk(&mut |e| {
        if matches!(
            e,
            Expr::ScalarSubquery { .. } | Expr::InSubquery { .. } | Expr::Exists(_)
        ) {
            found.push(e.clone());
        }
    });
    for e in found {
        match e {
            Expr::ScalarSubquery { plan } => out.push(plan),
            Expr::InSubquery { subquery, .. } => out.push(subquery),
            Expr::Exists(exists) => {
                let body = exists_body(&exists.inner, &exists.predicates)?;
                out.extend(statement_positions(&body, is_cte_ref)?);
            }
            _ => {}
        }
    }
    Ok(())
}

/// Statement plan of an EXISTS subquery: its inner relation filtered by the
/// correlation predicates
pub(crate) fn exists_body(inner: &Plan, predicates: &[Expr]) -> CompileResult<Plan> {
    if predicates.is_empty() {
        Ok(inner.clone())
    } else {
        inner.filter(predicates.to_vec())
    }
}
