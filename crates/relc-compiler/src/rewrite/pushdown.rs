//! Filter pushdown through projections and into aggregation `HAVING`
//!
//! [`can_push_through_projection`] and [`can_move_into_having`] are pure
//! eligibility checks; [`FilterPushdown`] applies them. A filter on a column
//! the projection renamed or computed is never pushed.

use super::{rewrite_bottom_up, RewritePass, RewriteState};
use crate::error::CompileResult;
use crate::ir::expr::Expr;
use crate::ir::plan::{Plan, RelOp};

/// Moves filters below projections and into aggregation `HAVING`
pub struct FilterPushdown;

impl RewritePass for FilterPushdown {
    fn name(&self) -> &'static str {
        "filter_pushdown"
    }

    fn description(&self) -> &'static str {
        "Fuses filters over projections into the projection input and filters over aggregations into HAVING"
    }

    fn rewrite(&self, plan: &Plan, state: &mut RewriteState) -> CompileResult<Plan> {
        rewrite_bottom_up(self.name(), plan, state, &mut |node, state| {
            let RelOp::Filter { input, predicates } = node.op() else {
                return Ok(None);
            };
            match input.op() {
                RelOp::Projection { .. } => {
                    let pushed = push_through_projection(input, predicates)?;
                    if let Some(replacement) = &pushed {
                        state.redirect(input, replacement);
                    }
                    Ok(pushed)
                }
                RelOp::Aggregation { .. } => {
                    let moved = move_into_having(input, predicates)?;
                    if let Some(replacement) = &moved {
                        state.redirect(input, replacement);
                    }
                    Ok(moved)
                }
                _ => Ok(None),
            }
        })
    }
}

/// The expression a pass-through output column `name` of `select_list`
/// stands for: a column reached through a star item, or an unrenamed
/// column item
pub(crate) fn passthrough_column(select_list: &[Expr], name: &str) -> Option<Expr> {
    select_list.iter().find_map(|item| match item {
        Expr::Star { rel } if rel.schema().contains(name) => rel.col(name).ok(),
        Expr::Column { name: n, .. } if n == name => Some(item.clone()),
        _ => None,
    })
}

/// Replace column references to `target` using `substitute`
pub(crate) fn substitute_columns(
    expr: &Expr,
    target: &Plan,
    substitute: &dyn Fn(&str) -> Option<Expr>,
) -> Option<Expr> {
    let mut complete = true;
    let result = expr.transform(&mut |e| {
        Ok(match e {
            Expr::Column { rel, name, .. } if rel == target => match substitute(name) {
                Some(replacement) => Some(replacement),
                None => {
                    complete = false;
                    Some(e.clone())
                }
            },
            Expr::Star { rel } if rel == target => {
                complete = false;
                Some(e.clone())
            }
            _ => None,
        })
    });
    match result {
        Ok(expr) if complete => Some(expr),
        _ => None,
    }
}

/// Whether `pred` only references pass-through columns of `projection`
/// (or relations other than the projection itself)
pub fn can_push_through_projection(pred: &Expr, projection: &Plan) -> bool {
    let RelOp::Projection { select_list, .. } = projection.op() else {
        return false;
    };
    substitute_columns(pred, projection, &|name| {
        passthrough_column(select_list, name)
    })
    .is_some()
}

/// Whether `pred` can become a `HAVING` predicate of `aggregation`: it
/// references at least one metric and nothing but keys and metrics
pub fn can_move_into_having(pred: &Expr, aggregation: &Plan) -> bool {
    let RelOp::Aggregation { keys, metrics, .. } = aggregation.op() else {
        return false;
    };
    let mut uses_metric = false;
    let mut only_outputs = true;
    pred.walk(&mut |e| match e {
        Expr::Column { rel, name, .. } if rel == aggregation => {
            if metrics.iter().any(|m| m.output_name() == Some(name)) {
                uses_metric = true;
            } else if !keys.iter().any(|k| k.output_name() == Some(name)) {
                only_outputs = false;
            }
        }
        Expr::Column { .. } | Expr::Star { .. } => only_outputs = false,
        Expr::ScalarSubquery { .. } | Expr::InSubquery { .. } | Expr::Exists(_) => {
            only_outputs = false
        }
        _ => {}
    });
    uses_metric && only_outputs
}

fn push_through_projection(projection: &Plan, predicates: &[Expr]) -> CompileResult<Option<Plan>> {
    let RelOp::Projection { input, select_list } = projection.op() else {
        return Ok(None);
    };
    let mut pushed = Vec::with_capacity(predicates.len());
    for pred in predicates {
        match substitute_columns(pred, projection, &|name| {
            passthrough_column(select_list, name)
        }) {
            Some(substituted) => pushed.push(substituted),
            None => return Ok(None),
        }
    }
    // keep sinking through stacked projections
    let below = match push_through_projection(input, &pushed)? {
        Some(deeper) => deeper,
        None => input.filter(pushed)?,
    };
    log::debug!("pushed filter below projection");
    below.project(select_list.clone()).map(Some)
}

fn move_into_having(aggregation: &Plan, predicates: &[Expr]) -> CompileResult<Option<Plan>> {
    let RelOp::Aggregation {
        input,
        keys,
        metrics,
        having,
    } = aggregation.op()
    else {
        return Ok(None);
    };
    if !predicates
        .iter()
        .all(|p| can_move_into_having(p, aggregation))
    {
        return Ok(None);
    }
    let output_expr = |name: &str| {
        keys.iter()
            .chain(metrics)
            .find(|e| e.output_name() == Some(name))
            .map(|e| e.unaliased().clone())
    };
    let mut merged = having.clone();
    for pred in predicates {
        match substitute_columns(pred, aggregation, &output_expr) {
            Some(substituted) => merged.push(substituted),
            None => return Ok(None),
        }
    }
    input
        .aggregate_having(keys.clone(), metrics.clone(), merged)
        .map(Some)
}

#[cfg(test)]
#[path = "pushdown_test.rs"]
mod tests;
