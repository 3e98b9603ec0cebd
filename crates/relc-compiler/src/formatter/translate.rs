//! Expression translation into resolved [`SqlExpr`] values

use super::chain::exists_body;
use super::statement::SqlExpr;
use super::QueryFormatter;
use crate::context::Context;
use crate::error::{CompileError, CompileResult};
use crate::ir::expr::{AggFunc, Expr};

impl QueryFormatter<'_> {
    /// Translate `expr` in the scope currently on top of the stack
    pub(crate) fn translate(&mut self, ctx: &mut Context, expr: &Expr) -> CompileResult<SqlExpr> {
        let translated = match expr {
            Expr::Column { rel, name, .. } => SqlExpr::Column {
                qualifier: ctx.resolve_column(rel, name)?,
                name: name.clone(),
            },
            Expr::Star { rel } => {
                let mut qualifiers = ctx.resolve_star(rel)?;
                if qualifiers.len() != 1 {
                    return Err(CompileError::invalid(
                        "star over several relations used as an expression",
                    ));
                }
                SqlExpr::Star {
                    qualifier: qualifiers.remove(0),
                }
            }
            Expr::Literal { value, ty } => SqlExpr::Literal {
                value: value.clone(),
                ty: ty.clone(),
            },
            Expr::BinaryOp { left, op, right } => SqlExpr::Binary {
                left: Box::new(self.translate(ctx, left)?),
                op: *op,
                right: Box::new(self.translate(ctx, right)?),
            },
            Expr::UnaryOp { op, expr } => SqlExpr::Unary {
                op: *op,
                expr: Box::new(self.translate(ctx, expr)?),
            },
            Expr::Function { name, args, .. } => SqlExpr::Function {
                name: name.clone(),
                args: self.translate_all(ctx, args)?,
                distinct: false,
            },
            Expr::Aggregate { func, arg, .. } => match (func, arg) {
                (AggFunc::CountStar, _) => SqlExpr::CountStar,
                (func, None) => {
                    return Err(CompileError::invalid(format!(
                        "{} aggregate without an argument",
                        func.sql_name()
                    )))
                }
                (func, Some(arg)) => SqlExpr::Function {
                    name: func.sql_name().to_string(),
                    args: vec![self.translate(ctx, arg)?],
                    distinct: *func == AggFunc::CountDistinct,
                },
            },
            Expr::Cast { expr, to } => SqlExpr::Cast {
                expr: Box::new(self.translate(ctx, expr)?),
                to: to.clone(),
            },
            Expr::Case {
                base,
                conditions,
                results,
                else_result,
                ty,
            } => SqlExpr::Case {
                base: match base {
                    Some(b) => Some(Box::new(self.translate(ctx, b)?)),
                    None => None,
                },
                conditions: self.translate_all(ctx, conditions)?,
                results: self.translate_all(ctx, results)?,
                else_result: match else_result {
                    Some(e) => Some(Box::new(self.translate(ctx, e)?)),
                    None => None,
                },
                ty: ty.clone(),
            },
            Expr::IsNull { expr, negated } => SqlExpr::IsNull {
                expr: Box::new(self.translate(ctx, expr)?),
                negated: *negated,
            },
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => SqlExpr::Between {
                expr: Box::new(self.translate(ctx, expr)?),
                low: Box::new(self.translate(ctx, low)?),
                high: Box::new(self.translate(ctx, high)?),
                negated: *negated,
            },
            Expr::InList {
                expr,
                list,
                negated,
            } => SqlExpr::InList {
                expr: Box::new(self.translate(ctx, expr)?),
                list: self.translate_all(ctx, list)?,
                negated: *negated,
            },
            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => SqlExpr::InSubquery {
                expr: Box::new(self.translate(ctx, expr)?),
                query: Box::new(self.format_statement(ctx, subquery)?),
                negated: *negated,
            },
            Expr::ScalarSubquery { plan } => {
                SqlExpr::Subquery(Box::new(self.format_statement(ctx, plan)?))
            }
            Expr::Exists(exists) => {
                let body = exists_body(&exists.inner, &exists.predicates)?;
                SqlExpr::Exists {
                    query: Box::new(self.format_exists(ctx, &body)?),
                    negated: exists.negated,
                }
            }
            Expr::Any { .. } => {
                return Err(CompileError::unsupported(
                    self.dialect.name(),
                    "ANY predicate that was not lowered to EXISTS",
                ))
            }
            Expr::TopK(_) => {
                return Err(CompileError::unsupported(
                    self.dialect.name(),
                    "top-k predicate that was not decomposed into a semi-join",
                ))
            }
            Expr::Alias { expr, .. } => self.translate(ctx, expr)?,
        };
        Ok(translated)
    }

    fn translate_all(&mut self, ctx: &mut Context, exprs: &[Expr]) -> CompileResult<Vec<SqlExpr>> {
        exprs.iter().map(|e| self.translate(ctx, e)).collect()
    }
}
