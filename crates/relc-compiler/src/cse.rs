//! Common sub-plan extraction
//!
//! A sub-plan occupying two or more relation positions of the formatted
//! query is registered as a CTE in the [`Context`]. Positions are counted
//! with the same statement collapse the formatter uses, so only plans that
//! would otherwise be rendered twice become CTEs.

use crate::context::{Context, Cte};
use crate::error::CompileResult;
use crate::formatter::chain::statement_positions;
use crate::ir::plan::Plan;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Register every repeated, self-contained sub-plan of `plan` as a CTE.
///
/// Plans already registered are treated as opaque, so running the
/// extraction again over the same context registers nothing new.
/// Returns the number of CTEs registered by this call.
pub fn extract_ctes(plan: &Plan, ctx: &mut Context) -> CompileResult<usize> {
    let before = ctx.ctes().len();
    let view: &Context = ctx;
    let mut counter = PositionCounter {
        ctx: view,
        counts: HashMap::new(),
        first_seen: Vec::new(),
    };
    let positions = statement_positions(plan, &|p| view.cte_name(p).is_some())?;
    for position in positions {
        counter.visit(&position)?;
    }

    let PositionCounter {
        counts, first_seen, ..
    } = counter;
    let candidates: Vec<Plan> = first_seen
        .into_iter()
        .filter(|p| counts.get(p).copied().unwrap_or(0) > 1)
        .filter(|p| !p.is_table())
        .filter(is_closed)
        .collect();
    log::debug!("{} repeated sub-plan(s) qualify as CTEs", candidates.len());

    for plan in dependency_order(&candidates) {
        ctx.register_cte(&plan);
    }
    let ordered = dependency_order(&ctx.ctes().iter().map(|c| c.plan.clone()).collect::<Vec<_>>());
    let reordered: Vec<Cte> = ordered
        .iter()
        .filter_map(|p| {
            ctx.cte_name(p).map(|name| Cte {
                name: name.to_string(),
                plan: p.clone(),
            })
        })
        .collect();
    ctx.reorder_ctes(reordered);
    Ok(ctx.ctes().len() - before)
}

struct PositionCounter<'c> {
    ctx: &'c Context,
    counts: HashMap<Plan, usize>,
    first_seen: Vec<Plan>,
}

impl PositionCounter<'_> {
    /// Count one occurrence of `plan`, descending on first sight only
    fn visit(&mut self, plan: &Plan) -> CompileResult<()> {
        let count = self.counts.entry(plan.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            return Ok(());
        }
        self.first_seen.push(plan.clone());
        if plan.is_table() || self.ctx.cte_name(plan).is_some() {
            return Ok(());
        }
        let ctx = self.ctx;
        let positions = statement_positions(plan, &|p| ctx.cte_name(p).is_some())?;
        for position in positions {
            self.visit(&position)?;
        }
        Ok(())
    }
}

/// Every node reachable from `plan` through inputs and subquery plans
fn subtree(plan: &Plan) -> HashSet<Plan> {
    let mut nodes = HashSet::new();
    let mut stack = vec![plan.clone()];
    while let Some(node) = stack.pop() {
        if !nodes.insert(node.clone()) {
            continue;
        }
        stack.extend(node.op().inputs().into_iter().cloned());
        for expr in node.op().expressions() {
            stack.extend(expr.subquery_plans());
        }
    }
    nodes
}

/// Whether every column reference inside `plan` targets a node of `plan`'s
/// own subtree; correlated sub-plans cannot be hoisted
fn is_closed(plan: &Plan) -> bool {
    let nodes = subtree(plan);
    nodes.iter().all(|node| {
        node.op().expressions().into_iter().all(|expr| {
            expr.referenced_relations()
                .iter()
                .all(|rel| nodes.contains(rel))
        })
    })
}

/// `plans` ordered so that each plan follows every other plan it contains,
/// ties kept in input order
fn dependency_order(plans: &[Plan]) -> Vec<Plan> {
    let mut graph: DiGraph<Plan, ()> = DiGraph::new();
    let indices: Vec<NodeIndex> = plans.iter().map(|p| graph.add_node(p.clone())).collect();
    let subtrees: Vec<HashSet<Plan>> = plans.iter().map(subtree).collect();
    for (i, outer) in plans.iter().enumerate() {
        for (j, inner) in plans.iter().enumerate() {
            if i != j && inner != outer && subtrees[i].contains(inner) {
                graph.add_edge(indices[j], indices[i], ());
            }
        }
    }
    match toposort(&graph, None) {
        Ok(order) => order.into_iter().map(|ix| graph[ix].clone()).collect(),
        Err(cycle) => {
            log::warn!(
                "cycle between CTE candidates at {:?}; keeping discovery order",
                graph[cycle.node_id()]
            );
            plans.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::expr::Expr;
    use crate::test_utils::*;

    fn positive_f() -> Plan {
        let t = star1();
        t.filter(vec![t.col("f").unwrap().gt(Expr::lit_int(0))])
            .unwrap()
    }

    fn self_join(sub: &Plan) -> Plan {
        let view = sub.view();
        sub.inner_join(
            &view,
            vec![sub.col("foo_id").unwrap().eq(view.col("foo_id").unwrap())],
        )
        .unwrap()
    }

    #[test]
    fn test_repeated_subplan_is_extracted() {
        let sub = positive_f();
        let plan = self_join(&sub);
        let mut ctx = Context::new();
        assert_eq!(extract_ctes(&plan, &mut ctx).unwrap(), 1);
        assert_eq!(ctx.cte_name(&sub), Some("t0"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let plan = self_join(&positive_f());
        let mut ctx = Context::new();
        extract_ctes(&plan, &mut ctx).unwrap();
        assert_eq!(extract_ctes(&plan, &mut ctx).unwrap(), 0);
        assert_eq!(ctx.ctes().len(), 1);
    }

    #[test]
    fn test_repeated_table_is_not_extracted() {
        let t = star1();
        let plan = self_join(&t);
        let mut ctx = Context::new();
        assert_eq!(extract_ctes(&plan, &mut ctx).unwrap(), 0);
    }

    #[test]
    fn test_single_use_is_not_extracted() {
        let sub = positive_f();
        let other = star2();
        let plan = sub
            .inner_join(
                &other,
                vec![sub.col("foo_id").unwrap().eq(other.col("foo_id").unwrap())],
            )
            .unwrap();
        let mut ctx = Context::new();
        assert_eq!(extract_ctes(&plan, &mut ctx).unwrap(), 0);
    }

    #[test]
    fn test_correlated_subplan_is_not_closed() {
        let (foo, bar) = (foo_t(), bar_t());
        let correlated = bar
            .filter(vec![foo.col("key1").unwrap().eq(bar.col("key1").unwrap())])
            .unwrap();
        assert!(!is_closed(&correlated));
        assert!(is_closed(&positive_f()));
    }

    #[test]
    fn test_nested_ctes_are_ordered_inner_first() {
        let inner = positive_f();
        let outer = self_join(&inner)
            .limit(10, 0)
            .unwrap();
        let plan = outer.union_all(&outer).unwrap();
        let mut ctx = Context::new();
        assert_eq!(extract_ctes(&plan, &mut ctx).unwrap(), 2);
        let names: Vec<&str> = ctx.ctes().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["t0", "t1"]);
        assert_eq!(ctx.ctes()[0].plan, inner);
        assert_eq!(ctx.ctes()[1].plan, outer);
    }
}
