//! Decomposition of top-k filter predicates into an explicit semi-join

use super::{rewrite_bottom_up, RewritePass, RewriteState};
use crate::error::CompileResult;
use crate::ir::expr::Expr;
use crate::ir::plan::{Plan, RelOp};

/// Rewrites `Filter(rel, [TopK, ...])` into a left-semi join against the
/// limited, sorted aggregation of the top-k
pub struct TopKDecomposition;

impl RewritePass for TopKDecomposition {
    fn name(&self) -> &'static str {
        "topk_decomposition"
    }

    fn description(&self) -> &'static str {
        "Rewrites top-k predicates to aggregation, sort and limit joined back with a semi-join"
    }

    fn rewrite(&self, plan: &Plan, state: &mut RewriteState) -> CompileResult<Plan> {
        rewrite_bottom_up(self.name(), plan, state, &mut |node, _| {
            let RelOp::Filter { input, predicates } = node.op() else {
                return Ok(None);
            };
            if !predicates.iter().any(|p| matches!(p, Expr::TopK(_))) {
                return Ok(None);
            }

            let mut current = input.clone();
            let mut remaining = Vec::new();
            for pred in predicates {
                match pred {
                    Expr::TopK(topk) => {
                        let limited = topk.to_aggregation()?;
                        let key = limited.col(topk.key_name()?)?;
                        current = current.semi_join(&limited, vec![topk.key.clone().eq(key)])?;
                    }
                    other => remaining.push(other.clone()),
                }
            }
            if remaining.is_empty() {
                Ok(Some(current))
            } else {
                current.filter(remaining).map(Some)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use relc_sql::JoinKind;

    #[test]
    fn test_topk_matches_hand_built_semi_join() {
        let t = star1();
        let key = t.col("foo_id").unwrap();
        let topk = key.clone().topk(10, None).unwrap();
        let plan = t.filter(vec![topk.clone()]).unwrap();

        let rewritten = TopKDecomposition
            .rewrite(&plan, &mut RewriteState::new("generic"))
            .unwrap();

        let Expr::TopK(topk) = topk else {
            panic!("expected top-k");
        };
        let limited = topk.to_aggregation().unwrap();
        let expected = t
            .semi_join(
                &limited,
                vec![key.eq(limited.col("foo_id").unwrap())],
            )
            .unwrap();
        assert_eq!(rewritten, expected);
    }

    #[test]
    fn test_other_predicates_stay_above_join() {
        let t = star1();
        let topk = t
            .col("foo_id")
            .unwrap()
            .topk(5, Some(t.col("f").unwrap().sum().name("total")))
            .unwrap();
        let other = t.col("c").unwrap().gt(Expr::lit_int(0));
        let plan = t.filter(vec![other.clone(), topk]).unwrap();
        let rewritten = TopKDecomposition
            .rewrite(&plan, &mut RewriteState::new("generic"))
            .unwrap();
        let RelOp::Filter { input, predicates } = rewritten.op() else {
            panic!("expected filter");
        };
        assert_eq!(predicates, &vec![other]);
        assert!(matches!(
            input.op(),
            RelOp::Join {
                kind: JoinKind::LeftSemi,
                ..
            }
        ));
    }
}
