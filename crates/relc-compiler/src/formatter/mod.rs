//! Query formatter: turns a rewritten plan into abstract SELECT statements.
//!
//! Each statement absorbs a chain of unary nodes (see [`chain`]), places the
//! remaining plan into `FROM`, and resolves every column reference against
//! the correlation-scope stack held by [`Context`]. Statements whose
//! relations are referenced from a nested subquery, or which reference an
//! enclosing statement themselves, are re-formatted with aliases.

pub(crate) mod chain;
pub mod statement;
mod translate;

use crate::context::{Context, Scope, ScopeRelation};
use crate::error::{CompileError, CompileResult};
use crate::ir::expr::Expr;
use crate::ir::plan::{Plan, RelOp};
use chain::{Chain, FromRelations};
use relc_sql::{SetOpKind, SqlDialect};
use statement::{
    CteDefinition, FromClause, GroupKey, JoinClause, OrderKey, Query, SelectItem,
    SelectStatement, SqlExpr, TableRef,
};

/// What a FROM position renders as
enum Source {
    Table(String),
    Cte(String),
    Subquery(Plan),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Shape {
    Normal,
    /// Body of an EXISTS subquery: select list `1` unless a projection or
    /// aggregation was absorbed
    Exists,
}

/// Builds [`Query`] values for one dialect
pub struct QueryFormatter<'a> {
    dialect: &'a dyn SqlDialect,
    /// CTE whose body is being formatted; not treated as a reference to itself
    defining: Option<Plan>,
}

impl<'a> QueryFormatter<'a> {
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self {
            dialect,
            defining: None,
        }
    }

    /// Format `plan` and the bodies of every CTE registered in `ctx`.
    ///
    /// The main statement is formatted first so that alias numbering
    /// follows reading order of the final query after the CTE names.
    pub fn format_query(&mut self, ctx: &mut Context, plan: &Plan) -> CompileResult<Query> {
        let body = self.format_statement(ctx, plan)?;
        let mut ctes = Vec::with_capacity(ctx.ctes().len());
        for cte in ctx.ctes().to_vec() {
            self.defining = Some(cte.plan.clone());
            let formatted = self.format_statement(ctx, &cte.plan);
            self.defining = None;
            ctes.push(CteDefinition {
                name: cte.name,
                body: formatted?,
            });
        }
        Ok(Query { ctes, body })
    }

    fn cte_ref<'c>(&self, ctx: &'c Context, plan: &Plan) -> Option<&'c str> {
        if self.defining.as_ref().is_some_and(|d| d == plan) {
            return None;
        }
        ctx.cte_name(plan)
    }

    fn collapse(&self, ctx: &Context, plan: &Plan) -> Chain {
        Chain::collapse(plan, &|p| self.cte_ref(ctx, p).is_some())
    }

    fn is_set_op(&self, ctx: &Context, plan: &Plan) -> Option<SetOpKind> {
        match plan.op() {
            RelOp::SetOp { kind, .. } if self.cte_ref(ctx, plan).is_none() => Some(*kind),
            _ => None,
        }
    }

    /// Format `plan` as one statement, chaining set operations
    pub(crate) fn format_statement(
        &mut self,
        ctx: &mut Context,
        plan: &Plan,
    ) -> CompileResult<SelectStatement> {
        match plan.op() {
            RelOp::SetOp { kind, left, right } if self.is_set_op(ctx, plan).is_some() => {
                self.format_set_op(ctx, *kind, left, right)
            }
            _ => self.format_select(ctx, plan, Shape::Normal),
        }
    }

    fn format_set_op(
        &mut self,
        ctx: &mut Context,
        kind: SetOpKind,
        left: &Plan,
        right: &Plan,
    ) -> CompileResult<SelectStatement> {
        let mut stmt = if self.is_set_op(ctx, left) == Some(kind) {
            self.format_statement(ctx, left)?
        } else {
            self.set_op_side(ctx, left)?
        };
        let next = self.set_op_side(ctx, right)?;
        stmt.chain(kind, next);
        Ok(stmt)
    }

    /// A set-operation operand; nested set operations and operands with
    /// their own ORDER BY/LIMIT are wrapped in a sub-select
    fn set_op_side(&mut self, ctx: &mut Context, side: &Plan) -> CompileResult<SelectStatement> {
        let needs_wrap = self.is_set_op(ctx, side).is_some()
            || (self.cte_ref(ctx, side).is_none() && self.collapse(ctx, side).has_ordering());
        if !needs_wrap {
            return self.format_select(ctx, side, Shape::Normal);
        }
        let alias = ctx.next_alias();
        let inner = self.format_statement(ctx, side)?;
        Ok(SelectStatement {
            select_list: vec![SelectItem {
                expr: SqlExpr::Star {
                    qualifier: Some(alias.clone()),
                },
                alias: None,
            }],
            from: Some(FromClause {
                base: TableRef::Subquery {
                    query: Box::new(inner),
                    alias,
                },
                joins: Vec::new(),
            }),
            ..SelectStatement::default()
        })
    }

    /// Format the body of an EXISTS subquery
    pub(crate) fn format_exists(
        &mut self,
        ctx: &mut Context,
        body: &Plan,
    ) -> CompileResult<SelectStatement> {
        if self.is_set_op(ctx, body).is_some() {
            return self.format_statement(ctx, body);
        }
        self.format_select(ctx, body, Shape::Exists)
    }

    fn format_select(
        &mut self,
        ctx: &mut Context,
        plan: &Plan,
        shape: Shape,
    ) -> CompileResult<SelectStatement> {
        let chain = self.collapse(ctx, plan);
        let checkpoint = ctx.checkpoint();
        let (stmt, scope) = self.build_select(ctx, &chain, shape, false)?;
        if !scope.aliased && (scope.referenced_from_nested || scope.correlated) {
            log::debug!(
                "re-formatting {} statement with aliases",
                plan.op().variant_name()
            );
            ctx.restore(checkpoint);
            let (stmt, _) = self.build_select(ctx, &chain, shape, true)?;
            return Ok(stmt);
        }
        Ok(stmt)
    }

    fn source(&self, ctx: &Context, relation: &Plan) -> Source {
        if let Some(name) = self.cte_ref(ctx, relation) {
            return Source::Cte(name.to_string());
        }
        match relation.op() {
            RelOp::PhysicalTable { name, .. } | RelOp::UnboundTable { name, .. } => {
                Source::Table(name.to_string())
            }
            RelOp::SelfReference { input, .. } => match self.source(ctx, input) {
                Source::Subquery(_) => Source::Subquery(input.clone()),
                other => other,
            },
            _ => Source::Subquery(relation.clone()),
        }
    }

    fn build_select(
        &mut self,
        ctx: &mut Context,
        chain: &Chain,
        shape: Shape,
        force_alias: bool,
    ) -> CompileResult<(SelectStatement, Scope)> {
        let view: &Context = ctx;
        let from = FromRelations::flatten(&chain.from, &|p| self.cte_ref(view, p).is_some());
        let sources: Vec<Source> = from.relations.iter().map(|r| self.source(view, r)).collect();
        let want_aliases = force_alias || from.relations.len() > 1;

        // aliases for every relation are minted before any sub-select is formatted
        let mut aliases: Vec<Option<String>> = Vec::with_capacity(sources.len());
        for source in &sources {
            let alias = match source {
                Source::Subquery(_) => Some(ctx.next_alias()),
                Source::Table(_) if want_aliases => Some(ctx.next_alias()),
                Source::Cte(name) if want_aliases => {
                    let taken = ctx.alias_in_use(name)
                        || aliases.iter().any(|a| a.as_deref() == Some(name.as_str()));
                    if taken {
                        Some(ctx.next_alias())
                    } else {
                        Some(name.clone())
                    }
                }
                _ => None,
            };
            aliases.push(alias);
        }

        let mut table_refs = Vec::with_capacity(sources.len());
        for (source, alias) in sources.into_iter().zip(&aliases) {
            let table_ref = match (source, alias) {
                (Source::Subquery(plan), Some(alias)) => TableRef::Subquery {
                    query: Box::new(self.format_statement(ctx, &plan)?),
                    alias: alias.clone(),
                },
                (Source::Subquery(_), None) => {
                    return Err(CompileError::invalid("sub-select without an alias"))
                }
                (Source::Table(name) | Source::Cte(name), alias) => TableRef::Named {
                    alias: alias.clone().filter(|a| a != &name),
                    name,
                },
            };
            table_refs.push(table_ref);
        }

        let mut absorbed = chain.absorbed.clone();
        absorbed.extend(from.join_nodes.iter().cloned());
        ctx.push_scope(Scope {
            relations: from
                .relations
                .iter()
                .zip(&aliases)
                .map(|(plan, alias)| ScopeRelation {
                    plan: plan.clone(),
                    alias: alias.clone(),
                })
                .collect(),
            select_node: chain.select.clone(),
            absorbed,
            aliased: aliases.iter().all(Option::is_some),
            ..Scope::default()
        });
        let clauses = self.translate_clauses(ctx, chain, &from, shape);
        let scope = ctx.pop_scope().unwrap_or_default();
        let clauses = clauses?;

        let mut table_refs = table_refs.into_iter();
        let base = table_refs
            .next()
            .ok_or_else(|| CompileError::invalid("statement without a FROM relation"))?;
        let joins = from
            .joins
            .iter()
            .zip(table_refs)
            .zip(clauses.join_predicates)
            .map(|(((kind, _), relation), predicates)| JoinClause {
                kind: *kind,
                relation,
                predicates,
            })
            .collect();

        let stmt = SelectStatement {
            select_list: clauses.select_list,
            from: Some(FromClause { base, joins }),
            where_: clauses.where_,
            group_by: clauses.group_by,
            having: clauses.having,
            order_by: clauses.order_by,
            limit: chain.limit,
            set_op: None,
        };
        Ok((stmt, scope))
    }

    /// Translate every clause of the statement with its scope pushed
    fn translate_clauses(
        &mut self,
        ctx: &mut Context,
        chain: &Chain,
        from: &FromRelations,
        shape: Shape,
    ) -> CompileResult<Clauses> {
        let mut clauses = Clauses::default();

        match chain.select.as_ref().map(|p| p.op()) {
            None if shape == Shape::Exists => {
                clauses.select_list.push(SelectItem {
                    expr: SqlExpr::one(),
                    alias: None,
                });
            }
            None if from.relations.len() > 1 && from.exposes_all() => {
                clauses.select_list.push(SelectItem {
                    expr: SqlExpr::Star { qualifier: None },
                    alias: None,
                });
            }
            None => {
                for qualifier in ctx.resolve_star(&chain.from)? {
                    clauses.select_list.push(SelectItem {
                        expr: SqlExpr::Star { qualifier },
                        alias: None,
                    });
                }
            }
            Some(RelOp::Projection { select_list, .. }) => {
                for item in select_list {
                    let items = self.select_item(ctx, item)?;
                    clauses.select_list.extend(items);
                }
            }
            Some(RelOp::Aggregation {
                keys,
                metrics,
                having,
                ..
            }) => {
                for item in keys.iter().chain(metrics) {
                    let items = self.select_item(ctx, item)?;
                    clauses.select_list.extend(items);
                }
                for (i, key) in keys.iter().enumerate() {
                    let group_key = if self.dialect.supports_group_by_ordinal() {
                        GroupKey::Ordinal(i + 1)
                    } else {
                        GroupKey::Expr(self.translate(ctx, key.unaliased())?)
                    };
                    clauses.group_by.push(group_key);
                }
                for predicate in having {
                    let translated = self.translate(ctx, predicate)?;
                    clauses.having.push(translated);
                }
            }
            Some(other) => {
                return Err(CompileError::invalid(format!(
                    "{} cannot provide a select list",
                    other.variant_name()
                )))
            }
        }

        for (_, predicates) in &from.joins {
            let mut translated = Vec::with_capacity(predicates.len());
            for predicate in predicates {
                translated.push(self.translate(ctx, predicate)?);
            }
            clauses.join_predicates.push(translated);
        }
        for predicate in &chain.predicates {
            let translated = self.translate(ctx, predicate)?;
            clauses.where_.push(translated);
        }
        for key in &chain.order_by {
            let expr = self.translate(ctx, &key.expr)?;
            clauses.order_by.push(OrderKey {
                expr,
                ascending: key.ascending,
            });
        }
        Ok(clauses)
    }

    fn select_item(&mut self, ctx: &mut Context, item: &Expr) -> CompileResult<Vec<SelectItem>> {
        if let Expr::Star { rel } = item {
            return Ok(ctx
                .resolve_star(rel)?
                .into_iter()
                .map(|qualifier| SelectItem {
                    expr: SqlExpr::Star { qualifier },
                    alias: None,
                })
                .collect());
        }
        let alias = match (item.output_name(), item.unaliased()) {
            (Some(name), Expr::Column { name: column, .. }) if name == column => None,
            (name, _) => name.map(str::to_string),
        };
        Ok(vec![SelectItem {
            expr: self.translate(ctx, item)?,
            alias,
        }])
    }
}

#[derive(Default)]
struct Clauses {
    select_list: Vec<SelectItem>,
    join_predicates: Vec<Vec<SqlExpr>>,
    where_: Vec<SqlExpr>,
    group_by: Vec<GroupKey>,
    having: Vec<SqlExpr>,
    order_by: Vec<OrderKey>,
}

#[cfg(test)]
#[path = "formatter_test.rs"]
mod tests;
