//! Rewrite infrastructure: semantics-preserving plan-to-plan passes

pub mod exists;
pub mod fusion;
pub mod pushdown;
pub mod topk;

use crate::error::CompileResult;
use crate::ir::expr::PlanSlot;
use crate::ir::plan::Plan;
use std::collections::{BTreeMap, HashMap};

/// State shared by the passes of one compilation
#[derive(Debug)]
pub struct RewriteState {
    dialect: String,
    applied: BTreeMap<&'static str, usize>,
    redirects: Vec<(Plan, Plan)>,
}

impl RewriteState {
    /// Create state for compiling to `dialect`
    pub fn new(dialect: &str) -> Self {
        Self {
            dialect: dialect.to_string(),
            applied: BTreeMap::new(),
            redirects: Vec::new(),
        }
    }

    /// Target dialect name, used in error messages
    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    /// Number of nodes a pass has rewritten so far
    pub fn applied(&self, pass: &str) -> usize {
        self.applied.get(pass).copied().unwrap_or(0)
    }

    fn record(&mut self, pass: &'static str) {
        *self.applied.entry(pass).or_insert(0) += 1;
    }

    /// Column references to `old` anywhere above the current node now
    /// point at `new`, which exposes the same columns
    pub fn redirect(&mut self, old: &Plan, new: &Plan) {
        self.redirects.push((old.clone(), new.clone()));
    }
}

/// A plan-to-plan rewrite pass
pub trait RewritePass: Send + Sync {
    /// Pass name (used for filtering and display)
    fn name(&self) -> &'static str;
    /// Human-readable description
    fn description(&self) -> &'static str;
    /// Rewrite a whole plan
    fn rewrite(&self, plan: &Plan, state: &mut RewriteState) -> CompileResult<Plan>;
}

/// Manages and runs rewrite passes in order
pub struct RewritePassManager {
    passes: Vec<Box<dyn RewritePass>>,
}

impl RewritePassManager {
    /// Create a manager with all built-in passes registered
    pub fn with_defaults() -> Self {
        Self {
            passes: vec![
                Box::new(exists::ExistsLowering),
                Box::new(topk::TopKDecomposition),
                Box::new(pushdown::FilterPushdown),
                Box::new(fusion::ProjectionFusion),
            ],
        }
    }

    /// Run the passes over `plan`
    ///
    /// With a filter, only the named passes run. Pass names are checked when
    /// the configuration is loaded.
    pub fn run(
        &self,
        plan: &Plan,
        state: &mut RewriteState,
        pass_filter: Option<&[String]>,
    ) -> CompileResult<Plan> {
        let mut current = plan.clone();
        for pass in &self.passes {
            if let Some(filter) = pass_filter {
                if !filter.iter().any(|f| f == pass.name()) {
                    log::debug!("Skipping rewrite pass {}", pass.name());
                    continue;
                }
            }
            current = pass.rewrite(&current, state)?;
            log::debug!(
                "Rewrite pass {} applied {} time(s)",
                pass.name(),
                state.applied(pass.name())
            );
        }
        Ok(current)
    }

    /// List all available pass names
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }
}

/// Rule applied to each node after its children were rewritten.
/// `None` keeps the node.
pub(crate) type Rule<'a> = dyn FnMut(&Plan, &mut RewriteState) -> CompileResult<Option<Plan>> + 'a;

/// Rewrite `plan` bottom-up with `rule`.
///
/// Inputs are rewritten first, then plans nested in expressions as
/// subqueries; references to rewritten nodes in expressions are re-pointed
/// at their replacements. A node is rebuilt only when something changed.
pub(crate) fn rewrite_bottom_up(
    pass: &'static str,
    plan: &Plan,
    state: &mut RewriteState,
    rule: &mut Rule<'_>,
) -> CompileResult<Plan> {
    let mut driver = BottomUp {
        pass,
        memo: HashMap::new(),
        views: HashMap::new(),
        redirects: HashMap::new(),
    };
    driver.visit(plan, state, rule)
}

struct BottomUp {
    pass: &'static str,
    memo: HashMap<Plan, Plan>,
    /// Rewritten self-references by occurrence; structurally equal views
    /// must stay distinct
    views: HashMap<u64, Plan>,
    redirects: HashMap<Plan, Plan>,
}

impl BottomUp {
    fn done(&self, plan: &Plan) -> Option<&Plan> {
        match plan.occurrence() {
            Some(id) => self.views.get(&id),
            None => self.memo.get(plan),
        }
    }

    fn repoint(&self, plan: &Plan) -> Plan {
        let redirected = match plan.occurrence() {
            Some(_) => None,
            None => self.redirects.get(plan),
        };
        redirected
            .or_else(|| self.done(plan))
            .cloned()
            .unwrap_or_else(|| plan.clone())
    }

    fn visit(
        &mut self,
        plan: &Plan,
        state: &mut RewriteState,
        rule: &mut Rule<'_>,
    ) -> CompileResult<Plan> {
        if let Some(done) = self.done(plan) {
            return Ok(done.clone());
        }

        let inputs = plan
            .op()
            .inputs()
            .into_iter()
            .map(|input| self.visit(input, state, rule))
            .collect::<CompileResult<Vec<_>>>()?;
        let op = plan.op().with_inputs(inputs)?.map_expressions(&mut |expr| {
            expr.map_plans(&mut |p, slot| match slot {
                PlanSlot::Position => self.visit(p, state, rule),
                PlanSlot::Reference => Ok(self.repoint(p)),
            })
        })?;
        let rebuilt = if op == *plan.op() {
            plan.clone()
        } else {
            Plan::new(op)?
        };

        let result = match rule(&rebuilt, state)? {
            Some(replacement) => {
                state.record(self.pass);
                replacement
            }
            None => rebuilt,
        };
        for (old, new) in state.redirects.drain(..) {
            self.redirects.insert(old, new);
        }
        match plan.occurrence() {
            Some(id) => self.views.insert(id, result.clone()),
            None => self.memo.insert(plan.clone(), result.clone()),
        };
        Ok(result)
    }
}

#[cfg(test)]
#[path = "rewrite_test.rs"]
mod tests;
