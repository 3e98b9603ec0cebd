//! Fusion of directly stacked projections

use super::pushdown::{passthrough_column, substitute_columns};
use super::{rewrite_bottom_up, RewritePass, RewriteState};
use crate::error::CompileResult;
use crate::ir::expr::Expr;
use crate::ir::plan::{Plan, RelOp};

/// Fuses `Projection(Projection(base))` into one projection over `base`
pub struct ProjectionFusion;

impl RewritePass for ProjectionFusion {
    fn name(&self) -> &'static str {
        "projection_fusion"
    }

    fn description(&self) -> &'static str {
        "Fuses a projection over a projection into a single projection"
    }

    fn rewrite(&self, plan: &Plan, state: &mut RewriteState) -> CompileResult<Plan> {
        rewrite_bottom_up(self.name(), plan, state, &mut |node, _| fuse(node))
    }
}

/// Fuse `node` with the projection directly below it, if every item of
/// `node` can be expressed over the lower projection's input
pub fn fuse(node: &Plan) -> CompileResult<Option<Plan>> {
    let RelOp::Projection {
        input: lower,
        select_list: upper_list,
    } = node.op()
    else {
        return Ok(None);
    };
    let RelOp::Projection {
        input: base,
        select_list: lower_list,
    } = lower.op()
    else {
        return Ok(None);
    };

    let mut fused = Vec::with_capacity(upper_list.len() + lower_list.len());
    for item in upper_list {
        if let Expr::Star { rel } = item {
            if rel == lower {
                fused.extend(lower_list.iter().cloned());
                continue;
            }
        }
        let Some(substituted) = substitute_columns(item, lower, &|name| {
            passthrough_column(lower_list, name)
        }) else {
            return Ok(None);
        };
        fused.push(match (item.output_name(), substituted.output_name()) {
            (Some(want), Some(have)) if want != have => substituted.name(want),
            _ => substituted,
        });
    }
    log::debug!(
        "fusing projections of {} and {} items",
        upper_list.len(),
        lower_list.len()
    );
    base.project(fused).map(Some)
}
