//! SQL text rendering of formatted statements
//!
//! Layout rules:
//! - clauses start on their own line (`FROM`, `WHERE`, `GROUP BY`, ...)
//! - joins are indented two spaces, their `ON` four
//! - several predicates are parenthesized and chained with `AND`, one per line
//! - sub-selects are parenthesized with their body indented two spaces
//! - the select list wraps once a line would exceed the configured width

use crate::error::{CompileError, CompileResult};
use crate::formatter::statement::{
    FromClause, GroupKey, OrderKey, Query, SelectItem, SelectStatement, SqlExpr, TableRef,
};
use crate::ir::expr::{BinOp, LiteralValue, UnOp};
use relc_core::sql_utils::escape_sql_string;
use relc_sql::SqlDialect;

/// Width of `"SELECT "`, the continuation indent of a wrapped select list
const SELECT_INDENT: usize = 7;

/// Renders [`Query`] values as SQL text for one dialect
pub struct SqlRenderer<'a> {
    dialect: &'a dyn SqlDialect,
    max_line_width: usize,
}

impl<'a> SqlRenderer<'a> {
    pub fn new(dialect: &'a dyn SqlDialect, max_line_width: usize) -> Self {
        Self {
            dialect,
            max_line_width,
        }
    }

    /// Render the CTE prefix followed by the main statement
    pub fn render_query(&self, query: &Query) -> CompileResult<String> {
        let body = self.render_statement(&query.body)?;
        if query.ctes.is_empty() {
            return Ok(body);
        }
        let mut definitions = Vec::with_capacity(query.ctes.len());
        for (i, cte) in query.ctes.iter().enumerate() {
            let keyword = if i == 0 { "WITH " } else { "" };
            definitions.push(format!(
                "{}{} AS (\n{}\n)",
                keyword,
                self.dialect.ident(&cte.name),
                indent(&self.render_statement(&cte.body)?, 2)
            ));
        }
        Ok(format!("{}\n{}", definitions.join(",\n"), body))
    }

    /// Render one statement and the statements chained to it
    pub fn render_statement(&self, stmt: &SelectStatement) -> CompileResult<String> {
        let mut out = self.render_select(stmt)?;
        if let Some((kind, next)) = &stmt.set_op {
            out.push('\n');
            out.push_str(kind.keyword());
            out.push('\n');
            out.push_str(&self.render_statement(next)?);
        }
        Ok(out)
    }

    fn render_select(&self, stmt: &SelectStatement) -> CompileResult<String> {
        let mut out = self.render_select_list(&stmt.select_list)?;
        if let Some(from) = &stmt.from {
            out.push_str(&self.render_from(from)?);
        }
        if !stmt.where_.is_empty() {
            out.push_str("\nWHERE ");
            out.push_str(&self.render_predicates(&stmt.where_, "WHERE ".len())?);
        }
        if !stmt.group_by.is_empty() {
            let keys = stmt
                .group_by
                .iter()
                .map(|key| match key {
                    GroupKey::Ordinal(i) => Ok(i.to_string()),
                    GroupKey::Expr(expr) => self.render_expr(expr),
                })
                .collect::<CompileResult<Vec<_>>>()?;
            out.push_str("\nGROUP BY ");
            out.push_str(&keys.join(", "));
        }
        if !stmt.having.is_empty() {
            out.push_str("\nHAVING ");
            out.push_str(&self.render_predicates(&stmt.having, "HAVING ".len())?);
        }
        if !stmt.order_by.is_empty() {
            let keys = stmt
                .order_by
                .iter()
                .map(|key| self.render_order_key(key))
                .collect::<CompileResult<Vec<_>>>()?;
            out.push_str("\nORDER BY ");
            out.push_str(&keys.join(", "));
        }
        if let Some((limit, offset)) = stmt.limit {
            out.push_str(&format!("\nLIMIT {}", limit));
            if offset > 0 {
                out.push_str(&format!(" OFFSET {}", offset));
            }
        }
        Ok(out)
    }

    /// `SELECT` and its items, wrapping long lists onto continuation lines
    fn render_select_list(&self, items: &[SelectItem]) -> CompileResult<String> {
        let mut out = String::from("SELECT");
        let mut line_length = 0;
        let mut tokens = 0;
        for (i, item) in items.iter().enumerate() {
            let value = self.render_select_item(item)?;
            if value.contains('\n') {
                if i > 0 {
                    out.push(',');
                }
                out.push('\n');
                out.push_str(&indent(&value, 2));
                line_length = value.lines().last().map_or(0, str::len) + 2;
                tokens = 1;
            } else if tokens > 0
                && line_length > 0
                && value.len() + line_length > self.max_line_width
            {
                out.push_str(",\n");
                out.push_str(&" ".repeat(SELECT_INDENT));
                out.push_str(&value);
                line_length = value.len() + SELECT_INDENT;
                tokens = 1;
            } else {
                out.push_str(if i > 0 { ", " } else { " " });
                out.push_str(&value);
                tokens += 1;
                line_length += value.len() + 2;
            }
        }
        Ok(out)
    }

    fn render_select_item(&self, item: &SelectItem) -> CompileResult<String> {
        let expr = self.render_expr(&item.expr)?;
        Ok(match &item.alias {
            Some(alias) => format!("{} AS {}", expr, self.dialect.ident(alias)),
            None => expr,
        })
    }

    fn render_from(&self, from: &FromClause) -> CompileResult<String> {
        let mut out = format!("\nFROM {}", self.render_table_ref(&from.base, 0)?);
        for join in &from.joins {
            let keyword = self.dialect.join_keyword(join.kind).ok_or_else(|| {
                CompileError::unsupported(self.dialect.name(), format!("{} join", join.kind))
            })?;
            out.push_str(&format!(
                "\n  {} {}",
                keyword,
                self.render_table_ref(&join.relation, 2)?
            ));
            if !join.predicates.is_empty() {
                out.push_str("\n    ON ");
                out.push_str(&self.render_predicates(&join.predicates, "    ON ".len())?);
            }
        }
        Ok(out)
    }

    /// A relation whose opening line is already placed at `level` spaces
    fn render_table_ref(&self, table: &TableRef, level: usize) -> CompileResult<String> {
        Ok(match table {
            TableRef::Named { name, alias } => match alias {
                Some(alias) => format!(
                    "{} {}",
                    self.dialect.table_name(name),
                    self.dialect.ident(alias)
                ),
                None => self.dialect.table_name(name),
            },
            TableRef::Subquery { query, alias } => format!(
                "(\n{}\n{}) {}",
                indent(&self.render_statement(query)?, level + 2),
                " ".repeat(level),
                self.dialect.ident(alias)
            ),
        })
    }

    /// One predicate bare; several parenthesized and joined with `AND`,
    /// continuation lines aligned at `align` spaces
    fn render_predicates(&self, predicates: &[SqlExpr], align: usize) -> CompileResult<String> {
        if let [single] = predicates {
            return self.render_expr(single);
        }
        let rendered = predicates
            .iter()
            .map(|p| self.render_expr(p).map(|s| format!("({})", s)))
            .collect::<CompileResult<Vec<_>>>()?;
        let margin = format!("\n{}", " ".repeat(align));
        Ok(rendered
            .iter()
            .map(|p| p.replace('\n', &margin))
            .collect::<Vec<_>>()
            .join(&format!(" AND{}", margin)))
    }

    fn render_order_key(&self, key: &OrderKey) -> CompileResult<String> {
        let expr = self.render_expr(&key.expr)?;
        Ok(if key.ascending {
            expr
        } else {
            format!("{} DESC", expr)
        })
    }

    /// Render an expression; nested subqueries span several lines
    pub fn render_expr(&self, expr: &SqlExpr) -> CompileResult<String> {
        Ok(match expr {
            SqlExpr::Column { qualifier, name } => match qualifier {
                Some(q) => format!("{}.{}", self.dialect.ident(q), self.dialect.ident(name)),
                None => self.dialect.ident(name),
            },
            SqlExpr::Star { qualifier } => match qualifier {
                Some(q) => format!("{}.*", self.dialect.ident(q)),
                None => "*".to_string(),
            },
            SqlExpr::Literal { value, .. } => self.render_literal(value)?,
            SqlExpr::Binary { left, op, right } => format!(
                "{} {} {}",
                self.render_operand(left)?,
                op,
                self.render_operand(right)?
            ),
            SqlExpr::Unary { op, expr } => match op {
                UnOp::Not => format!("NOT {}", self.render_operand(expr)?),
                UnOp::Negate => {
                    let operand = self.render_operand(expr)?;
                    if operand.starts_with('-') {
                        format!("-({})", operand)
                    } else {
                        format!("-{}", operand)
                    }
                }
            },
            SqlExpr::Function {
                name,
                args,
                distinct,
            } => {
                let args = self.render_list(args)?;
                if *distinct {
                    format!("{}(DISTINCT {})", name, args)
                } else {
                    format!("{}({})", name, args)
                }
            }
            SqlExpr::CountStar => "count(*)".to_string(),
            SqlExpr::Cast { expr, to } => format!(
                "CAST({} AS {})",
                self.render_expr(expr)?,
                self.dialect.type_name(to)
            ),
            SqlExpr::Case {
                base,
                conditions,
                results,
                else_result,
                ty,
            } => self.render_case(base.as_deref(), conditions, results, else_result.as_deref(), ty)?,
            SqlExpr::IsNull { expr, negated } => format!(
                "{} IS {}NULL",
                self.render_operand(expr)?,
                if *negated { "NOT " } else { "" }
            ),
            SqlExpr::Between {
                expr,
                low,
                high,
                negated,
            } => format!(
                "{} {}BETWEEN {} AND {}",
                self.render_operand(expr)?,
                not(*negated),
                self.render_operand(low)?,
                self.render_operand(high)?
            ),
            SqlExpr::InList {
                expr,
                list,
                negated,
            } => format!(
                "{} {}IN ({})",
                self.render_operand(expr)?,
                not(*negated),
                self.render_list(list)?
            ),
            SqlExpr::InSubquery {
                expr,
                query,
                negated,
            } => format!(
                "{} {}IN {}",
                self.render_operand(expr)?,
                not(*negated),
                self.render_subquery(query)?
            ),
            SqlExpr::Subquery(query) => self.render_subquery(query)?,
            SqlExpr::Exists { query, negated } => {
                format!("{}EXISTS {}", not(*negated), self.render_subquery(query)?)
            }
        })
    }

    fn render_operand(&self, expr: &SqlExpr) -> CompileResult<String> {
        let rendered = self.render_expr(expr)?;
        Ok(match expr {
            SqlExpr::Binary { .. } | SqlExpr::Between { .. } => format!("({})", rendered),
            _ => rendered,
        })
    }

    fn render_list(&self, exprs: &[SqlExpr]) -> CompileResult<String> {
        Ok(exprs
            .iter()
            .map(|e| self.render_expr(e))
            .collect::<CompileResult<Vec<_>>>()?
            .join(", "))
    }

    fn render_subquery(&self, query: &SelectStatement) -> CompileResult<String> {
        Ok(format!("(\n{}\n)", indent(&self.render_statement(query)?, 2)))
    }

    fn render_literal(&self, value: &LiteralValue) -> CompileResult<String> {
        Ok(match value {
            LiteralValue::Null => "NULL".to_string(),
            LiteralValue::Boolean(b) => self.dialect.boolean_literal(*b).to_string(),
            LiteralValue::Integer(i) => i.to_string(),
            LiteralValue::Float(f) if !f.is_finite() => {
                return Err(CompileError::unsupported(
                    self.dialect.name(),
                    format!("non-finite float literal {}", f),
                ))
            }
            LiteralValue::Float(f) => format!("{:?}", f),
            LiteralValue::String(s) => format!("'{}'", escape_sql_string(s)),
            LiteralValue::Date(d) => self.dialect.date_literal(d),
            LiteralValue::Timestamp(ts) => self.dialect.timestamp_literal(ts),
        })
    }

    /// CASE on one line for a single branch, one line per branch otherwise.
    ///
    /// A searched CASE whose conditions all compare the same expression for
    /// equality renders as a simple CASE over that expression.
    fn render_case(
        &self,
        base: Option<&SqlExpr>,
        conditions: &[SqlExpr],
        results: &[SqlExpr],
        else_result: Option<&SqlExpr>,
        ty: &relc_sql::SqlType,
    ) -> CompileResult<String> {
        let (base, conditions): (Option<&SqlExpr>, Vec<&SqlExpr>) = match base {
            Some(b) => (Some(b), conditions.iter().collect()),
            None => match simple_case_base(conditions) {
                Some(b) => (
                    Some(b),
                    conditions
                        .iter()
                        .filter_map(|c| match c {
                            SqlExpr::Binary { right, .. } => Some(right.as_ref()),
                            _ => None,
                        })
                        .collect(),
                ),
                None => (None, conditions.iter().collect()),
            },
        };

        let mut parts = Vec::with_capacity(conditions.len() + 2);
        for (condition, result) in conditions.iter().zip(results) {
            parts.push(format!(
                "WHEN {} THEN {}",
                self.render_expr(condition)?,
                self.render_expr(result)?
            ));
        }
        parts.push(match else_result {
            Some(e) => format!("ELSE {}", self.render_expr(e)?),
            None => format!("ELSE CAST(NULL AS {})", self.dialect.type_name(ty)),
        });
        let head = match base {
            Some(b) => format!("CASE {}", self.render_expr(b)?),
            None => "CASE".to_string(),
        };

        if conditions.len() > 1 {
            Ok(format!("{}\n{}\nEND", head, indent(&parts.join("\n"), 2)))
        } else {
            Ok(format!("{} {} END", head, parts.join(" ")))
        }
    }
}

/// The common left operand when every condition is `x = value` over the same `x`
fn simple_case_base(conditions: &[SqlExpr]) -> Option<&SqlExpr> {
    let mut base: Option<&SqlExpr> = None;
    for condition in conditions {
        let SqlExpr::Binary {
            left,
            op: BinOp::Eq,
            ..
        } = condition
        else {
            return None;
        };
        match base {
            Some(b) if b != left.as_ref() => return None,
            _ => base = Some(left.as_ref()),
        }
    }
    base
}

fn not(negated: bool) -> &'static str {
    if negated {
        "NOT "
    } else {
        ""
    }
}

/// Prefix every non-empty line of `text` with `width` spaces
fn indent(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                line.to_string()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
