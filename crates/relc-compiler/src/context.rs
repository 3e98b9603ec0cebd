//! Per-compilation state: alias allocation, CTE registry and the
//! correlation-scope stack used to resolve column references.

use crate::error::{CompileError, CompileResult};
use crate::ir::plan::{Plan, RelOp};
use std::collections::HashMap;

/// An extracted common sub-plan
#[derive(Debug, Clone)]
pub struct Cte {
    /// Minted name (`tN`)
    pub name: String,
    /// Defining plan
    pub plan: Plan,
}

/// A relation placed into the `FROM`/`JOIN` list of a statement
#[derive(Debug, Clone)]
pub struct ScopeRelation {
    /// The plan node occupying the position
    pub plan: Plan,
    /// Alias, when the statement is aliased or the relation is a sub-select
    pub alias: Option<String>,
}

/// Name-resolution scope of one statement being formatted
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// `FROM`/`JOIN` relations in order
    pub relations: Vec<ScopeRelation>,
    /// Projection or aggregation producing the select list
    pub select_node: Option<Plan>,
    /// Filter, sort, limit and join nodes folded into the statement
    pub absorbed: Vec<Plan>,
    /// Whether relations carry aliases
    pub aliased: bool,
    /// A nested statement referenced one of this statement's relations
    pub referenced_from_nested: bool,
    /// This statement referenced a relation of an enclosing statement
    pub correlated: bool,
}

#[derive(Clone, Copy)]
enum Match {
    Identity,
    Structural,
}

type Lookup = Option<Option<String>>;

impl Scope {
    fn same(mode: Match, a: &Plan, b: &Plan) -> bool {
        match mode {
            Match::Identity => a.ptr_eq(b),
            Match::Structural => a == b,
        }
    }

    fn lookup(&self, rel: &Plan, column: &str, mode: Match) -> CompileResult<Lookup> {
        if self
            .select_node
            .as_ref()
            .is_some_and(|n| Self::same(mode, n, rel))
        {
            return Ok(Some(None));
        }
        if let Some(r) = self.relations.iter().find(|r| Self::same(mode, &r.plan, rel)) {
            return qualify(r, column).map(Some);
        }
        if let Some(node) = self.absorbed.iter().find(|n| Self::same(mode, n, rel)) {
            return self.lookup_through(node, column);
        }
        // a relation realized as a sub-select still exposes the columns of
        // the filters, sorts, limits and joins inside it
        for r in &self.relations {
            if r.plan.schema().contains(column) && exposes(&r.plan, rel, mode) {
                return qualify(r, column).map(Some);
            }
        }
        Ok(None)
    }

    fn lookup_any(&self, rel: &Plan, column: &str) -> CompileResult<Lookup> {
        match self.lookup(rel, column, Match::Identity)? {
            Some(found) => Ok(Some(found)),
            None => self.lookup(rel, column, Match::Structural),
        }
    }

    fn lookup_through(&self, node: &Plan, column: &str) -> CompileResult<Lookup> {
        match node.op() {
            RelOp::Filter { input, .. }
            | RelOp::Sort { input, .. }
            | RelOp::Limit { input, .. }
            | RelOp::SelfReference { input, .. } => self.lookup_any(input, column),
            RelOp::Join {
                kind, left, right, ..
            } => {
                let in_left = left.schema().contains(column);
                let in_right = kind.exposes_right() && right.schema().contains(column);
                match (in_left, in_right) {
                    (true, true) => Err(CompileError::AmbiguousReference {
                        column: column.to_string(),
                        relation: format!("{:?}", node),
                    }),
                    (true, false) => self.lookup_any(left, column),
                    (false, true) => self.lookup_any(right, column),
                    (false, false) => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    /// Whether `alias` is already used by a relation of this scope
    pub fn uses_alias(&self, alias: &str) -> bool {
        self.relations
            .iter()
            .any(|r| r.alias.as_deref() == Some(alias))
    }
}

/// Qualifier of `column` in a relation of the FROM list; the relation's
/// output must carry the name once
fn qualify(relation: &ScopeRelation, column: &str) -> CompileResult<Option<String>> {
    if relation.plan.schema().occurrences(column) > 1 {
        return Err(CompileError::AmbiguousReference {
            column: column.to_string(),
            relation: format!("{:?}", relation.plan),
        });
    }
    Ok(relation.alias.clone())
}

/// Whether `inner` contributes its columns to the output of `outer`
/// through filters, sorts, limits and the exposed sides of joins
fn exposes(outer: &Plan, inner: &Plan, mode: Match) -> bool {
    let reaches = |input: &Plan| Scope::same(mode, input, inner) || exposes(input, inner, mode);
    match outer.op() {
        RelOp::Filter { input, .. } | RelOp::Sort { input, .. } | RelOp::Limit { input, .. } => {
            reaches(input)
        }
        RelOp::Join {
            kind, left, right, ..
        } => reaches(left) || (kind.exposes_right() && reaches(right)),
        _ => false,
    }
}

/// Compilation context, owned by exactly one top-level compile call
#[derive(Debug, Default)]
pub struct Context {
    next_alias: usize,
    ctes: Vec<Cte>,
    cte_index: HashMap<Plan, usize>,
    scopes: Vec<Scope>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the next `tN` name; shared by table aliases and CTE names
    pub fn next_alias(&mut self) -> String {
        let alias = format!("t{}", self.next_alias);
        self.next_alias += 1;
        alias
    }

    /// Current position of the alias counter
    pub fn checkpoint(&self) -> usize {
        self.next_alias
    }

    /// Rewind the alias counter to a previous checkpoint
    pub fn restore(&mut self, checkpoint: usize) {
        self.next_alias = checkpoint;
    }

    /// Register `plan` as a CTE, returning its name.
    ///
    /// Registering a plan that is already a CTE returns the existing name.
    pub fn register_cte(&mut self, plan: &Plan) -> String {
        if let Some(name) = self.cte_name(plan) {
            return name.to_string();
        }
        let name = self.next_alias();
        log::debug!("extracting {} as CTE {}", plan.op().variant_name(), name);
        self.cte_index.insert(plan.clone(), self.ctes.len());
        self.ctes.push(Cte {
            name: name.clone(),
            plan: plan.clone(),
        });
        name
    }

    /// Name of the CTE structurally equal to `plan`, if any
    pub fn cte_name(&self, plan: &Plan) -> Option<&str> {
        self.cte_index
            .get(plan)
            .and_then(|&i| self.ctes.get(i))
            .map(|c| c.name.as_str())
    }

    /// Registered CTEs in emission order
    pub fn ctes(&self) -> &[Cte] {
        &self.ctes
    }

    /// Replace the CTE list with the same CTEs in a new order
    pub(crate) fn reorder_ctes(&mut self, order: Vec<Cte>) {
        self.cte_index = order
            .iter()
            .enumerate()
            .map(|(i, c)| (c.plan.clone(), i))
            .collect();
        self.ctes = order;
    }

    pub fn push_scope(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn pop_scope(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    /// Number of scopes on the correlation stack
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Whether `alias` is used by any relation of a visible scope
    pub fn alias_in_use(&self, alias: &str) -> bool {
        self.scopes.iter().any(|s| s.uses_alias(alias))
    }

    /// Resolve a column of `rel` to its qualifier.
    ///
    /// Scopes are searched innermost first, by identity and then by
    /// structural equality. A hit in an enclosing scope marks that scope as
    /// referenced from a nested statement and the innermost scope as
    /// correlated. `Ok(None)` means the column renders unqualified.
    pub fn resolve_column(&mut self, rel: &Plan, column: &str) -> CompileResult<Option<String>> {
        let depth = self.scopes.len();
        for i in (0..depth).rev() {
            if let Some(qualifier) = self.scopes[i].lookup_any(rel, column)? {
                if i + 1 < depth {
                    log::debug!(
                        "column '{}' resolves {} scope(s) out",
                        column,
                        depth - 1 - i
                    );
                    self.scopes[i].referenced_from_nested = true;
                    self.scopes[depth - 1].correlated = true;
                }
                return Ok(qualifier);
            }
        }
        Err(CompileError::UnresolvedCorrelation {
            column: column.to_string(),
            relation: format!("{:?}", rel),
        })
    }

    /// Qualifiers of the relations exposed by `rel` in the innermost scope,
    /// used to expand `rel.*`
    pub fn resolve_star(&mut self, rel: &Plan) -> CompileResult<Vec<Option<String>>> {
        let Some(scope) = self.scopes.last() else {
            return Err(CompileError::invalid("star expansion outside a statement"));
        };
        let mut out = Vec::new();
        if star_qualifiers(scope, rel, &mut out)? {
            return Ok(out);
        }
        Err(CompileError::UnresolvedCorrelation {
            column: "*".to_string(),
            relation: format!("{:?}", rel),
        })
    }
}

fn star_qualifiers(
    scope: &Scope,
    rel: &Plan,
    out: &mut Vec<Option<String>>,
) -> CompileResult<bool> {
    for mode in [Match::Identity, Match::Structural] {
        if let Some(r) = scope.relations.iter().find(|r| Scope::same(mode, &r.plan, rel)) {
            out.push(r.alias.clone());
            return Ok(true);
        }
        if let Some(node) = scope.absorbed.iter().find(|n| Scope::same(mode, n, rel)) {
            return match node.op() {
                RelOp::Filter { input, .. }
                | RelOp::Sort { input, .. }
                | RelOp::Limit { input, .. }
                | RelOp::SelfReference { input, .. } => star_qualifiers(scope, input, out),
                RelOp::Join {
                    kind, left, right, ..
                } => {
                    let found_left = star_qualifiers(scope, left, out)?;
                    let found_right = if kind.exposes_right() {
                        star_qualifiers(scope, right, out)?
                    } else {
                        true
                    };
                    Ok(found_left && found_right)
                }
                _ => Ok(false),
            };
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn scope_with(relations: Vec<(Plan, Option<&str>)>) -> Scope {
        Scope {
            relations: relations
                .into_iter()
                .map(|(plan, alias)| ScopeRelation {
                    plan,
                    alias: alias.map(str::to_string),
                })
                .collect(),
            ..Scope::default()
        }
    }

    #[test]
    fn test_aliases_are_monotonic_and_restorable() {
        let mut ctx = Context::new();
        assert_eq!(ctx.next_alias(), "t0");
        let cp = ctx.checkpoint();
        assert_eq!(ctx.next_alias(), "t1");
        ctx.restore(cp);
        assert_eq!(ctx.next_alias(), "t1");
    }

    #[test]
    fn test_register_cte_is_idempotent() {
        let mut ctx = Context::new();
        let plan = star1().limit(10, 0).unwrap();
        let again = star1().limit(10, 0).unwrap();
        assert_eq!(ctx.register_cte(&plan), "t0");
        assert_eq!(ctx.register_cte(&again), "t0");
        assert_eq!(ctx.ctes().len(), 1);
        assert_eq!(ctx.cte_name(&again), Some("t0"));
    }

    #[test]
    fn test_resolve_in_current_scope() {
        let t = star1();
        let mut ctx = Context::new();
        ctx.push_scope(scope_with(vec![(t.clone(), Some("t0"))]));
        assert_eq!(ctx.resolve_column(&t, "c").unwrap(), Some("t0".to_string()));
    }

    #[test]
    fn test_resolve_structurally_equal_relation() {
        let mut ctx = Context::new();
        ctx.push_scope(scope_with(vec![(star1(), None)]));
        assert_eq!(ctx.resolve_column(&star1(), "c").unwrap(), None);
    }

    #[test]
    fn test_resolve_outer_scope_marks_correlation() {
        let outer = foo_t();
        let inner = bar_t();
        let mut ctx = Context::new();
        ctx.push_scope(scope_with(vec![(outer.clone(), Some("t0"))]));
        ctx.push_scope(scope_with(vec![(inner, Some("t1"))]));
        assert_eq!(
            ctx.resolve_column(&outer, "key1").unwrap(),
            Some("t0".to_string())
        );
        let inner_scope = ctx.pop_scope().unwrap();
        let outer_scope = ctx.pop_scope().unwrap();
        assert!(inner_scope.correlated);
        assert!(outer_scope.referenced_from_nested);
    }

    #[test]
    fn test_unresolved_reference() {
        let mut ctx = Context::new();
        ctx.push_scope(scope_with(vec![(star1(), None)]));
        let err = ctx.resolve_column(&star2(), "value1").unwrap_err();
        assert!(matches!(err, CompileError::UnresolvedCorrelation { .. }));
    }

    #[test]
    fn test_relation_repeating_a_column_is_ambiguous() {
        let (t1, t2) = (star1(), star2());
        let join = t1
            .inner_join(
                &t2,
                vec![t1.col("foo_id").unwrap().eq(t2.col("foo_id").unwrap())],
            )
            .unwrap();
        let mut ctx = Context::new();
        ctx.push_scope(scope_with(vec![(join.clone(), Some("t0"))]));
        assert_eq!(
            ctx.resolve_column(&join, "value1").unwrap(),
            Some("t0".to_string())
        );
        let err = ctx.resolve_column(&join, "foo_id").unwrap_err();
        assert!(matches!(err, CompileError::AmbiguousReference { ref column, .. } if column == "foo_id"));
        let err = ctx.resolve_column(&t2, "foo_id").unwrap_err();
        assert!(matches!(err, CompileError::AmbiguousReference { .. }));
    }

    #[test]
    fn test_resolve_through_both_sides_of_a_sub_select_join() {
        let (t1, t2, t3) = (star1(), star2(), star3());
        let inner = t2.cross_join(&t3).unwrap();
        let semi = t2
            .semi_join(&t3, vec![t2.col("value1").unwrap().eq(t3.col("value2").unwrap())])
            .unwrap();
        let mut ctx = Context::new();
        ctx.push_scope(scope_with(vec![
            (t1, Some("t0")),
            (inner, Some("t1")),
            (semi, Some("t2")),
        ]));
        assert_eq!(
            ctx.resolve_column(&t3, "value2").unwrap(),
            Some("t1".to_string())
        );
        assert_eq!(
            ctx.resolve_column(&t2, "value3").unwrap(),
            Some("t1".to_string())
        );
    }

    #[test]
    fn test_join_node_ambiguity() {
        let t1 = star1();
        let t2 = star2();
        let join = t1
            .inner_join(
                &t2,
                vec![t1.col("foo_id").unwrap().eq(t2.col("foo_id").unwrap())],
            )
            .unwrap();
        let mut scope = scope_with(vec![(t1, Some("t0")), (t2, Some("t1"))]);
        scope.absorbed.push(join.clone());
        let mut ctx = Context::new();
        ctx.push_scope(scope);
        assert_eq!(
            ctx.resolve_column(&join, "value1").unwrap(),
            Some("t1".to_string())
        );
        let err = ctx.resolve_column(&join, "foo_id").unwrap_err();
        assert!(matches!(err, CompileError::AmbiguousReference { .. }));
    }

    #[test]
    fn test_star_through_semi_join_exposes_left_only() {
        let t1 = star1();
        let t2 = star2();
        let join = t1
            .semi_join(
                &t2,
                vec![t1.col("foo_id").unwrap().eq(t2.col("foo_id").unwrap())],
            )
            .unwrap();
        let mut scope = scope_with(vec![(t1, Some("t0")), (t2, Some("t1"))]);
        scope.absorbed.push(join.clone());
        let mut ctx = Context::new();
        ctx.push_scope(scope);
        assert_eq!(
            ctx.resolve_star(&join).unwrap(),
            vec![Some("t0".to_string())]
        );
    }

    #[test]
    fn test_wrapped_relation_resolves_to_subselect_alias() {
        let t = star1();
        let limited = t.limit(10, 0).unwrap();
        let mut ctx = Context::new();
        ctx.push_scope(scope_with(vec![(limited, Some("t0"))]));
        assert_eq!(ctx.resolve_column(&t, "f").unwrap(), Some("t0".to_string()));
    }
}
