//! Lowering of `Any`/`NotAny` filter predicates to correlated EXISTS

use super::{rewrite_bottom_up, RewritePass, RewriteState};
use crate::error::{CompileError, CompileResult};
use crate::ir::expr::{ExistsSubquery, Expr};
use crate::ir::plan::{Plan, RelOp};

/// Rewrites `Any(pred)` predicates into `ExistsSubquery` expressions
pub struct ExistsLowering;

impl RewritePass for ExistsLowering {
    fn name(&self) -> &'static str {
        "exists_lowering"
    }

    fn description(&self) -> &'static str {
        "Lowers 'some related row satisfies' predicates to correlated EXISTS subqueries"
    }

    fn rewrite(&self, plan: &Plan, state: &mut RewriteState) -> CompileResult<Plan> {
        rewrite_bottom_up(self.name(), plan, state, &mut |node, state| {
            let RelOp::Filter { input, predicates } = node.op() else {
                return Ok(None);
            };
            if !predicates
                .iter()
                .any(|p| p.any_node(&|e| matches!(e, Expr::Any { .. })))
            {
                return Ok(None);
            }
            let lowered = predicates
                .iter()
                .map(|p| lower_predicate(p, input, state.dialect()))
                .collect::<CompileResult<Vec<_>>>()?;
            input.filter(lowered).map(Some)
        })
    }
}

fn lower_predicate(pred: &Expr, outer: &Plan, dialect: &str) -> CompileResult<Expr> {
    pred.transform(&mut |e| {
        let Expr::Any { predicate, negated } = e else {
            return Ok(None);
        };
        let foreign: Vec<Plan> = predicate
            .referenced_relations()
            .into_iter()
            .filter(|rel| !is_visible(outer, rel))
            .collect();
        match foreign.as_slice() {
            [inner] => Ok(Some(Expr::Exists(Box::new(ExistsSubquery {
                outer: outer.clone(),
                inner: inner.clone(),
                predicates: predicate.as_ref().clone().split_conjunction(),
                negated: *negated,
            })))),
            [] => Err(CompileError::unsupported(
                dialect,
                "Any predicate that references no relation outside the filtered one",
            )),
            many => Err(CompileError::unsupported(
                dialect,
                format!(
                    "Any predicate over {} related relations; only one is supported",
                    many.len()
                ),
            )),
        }
    })
}

/// Whether columns of `rel` are visible from a filter over `from`
pub(crate) fn is_visible(from: &Plan, rel: &Plan) -> bool {
    if from == rel {
        return true;
    }
    match from.op() {
        RelOp::Filter { input, .. }
        | RelOp::Sort { input, .. }
        | RelOp::Limit { input, .. }
        | RelOp::SelfReference { input, .. } => is_visible(input, rel),
        RelOp::Join { left, right, .. } => is_visible(left, rel) || is_visible(right, rel),
        _ => false,
    }
}
