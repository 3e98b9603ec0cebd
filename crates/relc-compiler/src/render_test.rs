use super::*;
use crate::formatter::statement::{FromClause, JoinClause};
use relc_sql::{GenericDialect, HiveDialect, JoinKind, MySqlDialect, SqlType};

fn col(qualifier: Option<&str>, name: &str) -> SqlExpr {
    SqlExpr::Column {
        qualifier: qualifier.map(str::to_string),
        name: name.to_string(),
    }
}

fn int(i: i64) -> SqlExpr {
    SqlExpr::Literal {
        value: LiteralValue::Integer(i),
        ty: SqlType::int64(),
    }
}

fn string(s: &str) -> SqlExpr {
    SqlExpr::Literal {
        value: LiteralValue::String(s.to_string()),
        ty: SqlType::String,
    }
}

fn binary(left: SqlExpr, op: BinOp, right: SqlExpr) -> SqlExpr {
    SqlExpr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

fn item(expr: SqlExpr) -> SelectItem {
    SelectItem { expr, alias: None }
}

fn from_table(name: &str, alias: Option<&str>) -> Option<FromClause> {
    Some(FromClause {
        base: TableRef::Named {
            name: name.to_string(),
            alias: alias.map(str::to_string),
        },
        joins: Vec::new(),
    })
}

fn render(stmt: &SelectStatement) -> String {
    let dialect = GenericDialect::new();
    SqlRenderer::new(&dialect, 70).render_statement(stmt).unwrap()
}

#[test]
fn test_select_star() {
    let stmt = SelectStatement {
        select_list: vec![item(SqlExpr::Star { qualifier: None })],
        from: from_table("t", None),
        ..SelectStatement::default()
    };
    assert_eq!(render(&stmt), "SELECT *\nFROM t");
}

#[test]
fn test_clause_layout() {
    let stmt = SelectStatement {
        select_list: vec![
            item(col(None, "foo_id")),
            SelectItem {
                expr: SqlExpr::Function {
                    name: "sum".to_string(),
                    args: vec![col(None, "f")],
                    distinct: false,
                },
                alias: Some("total".to_string()),
            },
        ],
        from: from_table("star1", None),
        where_: vec![
            binary(col(None, "f"), BinOp::Gt, int(0)),
            binary(col(None, "c"), BinOp::Lt, int(10)),
        ],
        group_by: vec![GroupKey::Ordinal(1)],
        having: vec![
            binary(SqlExpr::CountStar, BinOp::Gt, int(1)),
            binary(col(None, "foo_id"), BinOp::NotEq, string("x")),
        ],
        order_by: vec![OrderKey {
            expr: col(None, "total"),
            ascending: false,
        }],
        limit: Some((10, 5)),
        set_op: None,
    };
    let expected = "\
SELECT foo_id, sum(f) AS total
FROM star1
WHERE (f > 0) AND
      (c < 10)
GROUP BY 1
HAVING (count(*) > 1) AND
       (foo_id <> 'x')
ORDER BY total DESC
LIMIT 10 OFFSET 5";
    assert_eq!(render(&stmt), expected);
}

#[test]
fn test_zero_offset_is_omitted() {
    let stmt = SelectStatement {
        select_list: vec![item(SqlExpr::Star { qualifier: None })],
        from: from_table("t", None),
        limit: Some((10, 0)),
        ..SelectStatement::default()
    };
    assert_eq!(render(&stmt), "SELECT *\nFROM t\nLIMIT 10");
}

#[test]
fn test_join_layout_with_subselect() {
    let inner = SelectStatement {
        select_list: vec![item(SqlExpr::Star { qualifier: None })],
        from: from_table("star2", None),
        limit: Some((5, 0)),
        ..SelectStatement::default()
    };
    let stmt = SelectStatement {
        select_list: vec![item(SqlExpr::Star {
            qualifier: Some("t0".to_string()),
        })],
        from: Some(FromClause {
            base: TableRef::Named {
                name: "star1".to_string(),
                alias: Some("t0".to_string()),
            },
            joins: vec![JoinClause {
                kind: JoinKind::Inner,
                relation: TableRef::Subquery {
                    query: Box::new(inner),
                    alias: "t1".to_string(),
                },
                predicates: vec![
                    binary(col(Some("t0"), "foo_id"), BinOp::Eq, col(Some("t1"), "foo_id")),
                    binary(col(Some("t0"), "c"), BinOp::Lt, int(3)),
                ],
            }],
        }),
        ..SelectStatement::default()
    };
    let expected = "\
SELECT t0.*
FROM star1 t0
  INNER JOIN (
    SELECT *
    FROM star2
    LIMIT 5
  ) t1
    ON (t0.foo_id = t1.foo_id) AND
       (t0.c < 3)";
    assert_eq!(render(&stmt), expected);
}

#[test]
fn test_select_list_wraps_at_width() {
    let items: Vec<SelectItem> = (0..8)
        .map(|i| item(col(None, &format!("column_with_a_long_name_{:06}", i))))
        .collect();
    let stmt = SelectStatement {
        select_list: items,
        from: from_table("t", None),
        ..SelectStatement::default()
    };
    let expected = "\
SELECT column_with_a_long_name_000000, column_with_a_long_name_000001,
       column_with_a_long_name_000002, column_with_a_long_name_000003,
       column_with_a_long_name_000004, column_with_a_long_name_000005,
       column_with_a_long_name_000006, column_with_a_long_name_000007
FROM t";
    assert_eq!(render(&stmt), expected);
}

#[test]
fn test_case_layouts() {
    let dialect = GenericDialect::new();
    let renderer = SqlRenderer::new(&dialect, 70);
    let single = SqlExpr::Case {
        base: None,
        conditions: vec![binary(col(None, "c"), BinOp::Gt, int(0))],
        results: vec![string("pos")],
        else_result: None,
        ty: SqlType::String,
    };
    assert_eq!(
        renderer.render_expr(&single).unwrap(),
        "CASE WHEN c > 0 THEN 'pos' ELSE CAST(NULL AS VARCHAR) END"
    );

    let simple = SqlExpr::Case {
        base: None,
        conditions: vec![
            binary(col(None, "g"), BinOp::Eq, string("a")),
            binary(col(None, "g"), BinOp::Eq, string("b")),
        ],
        results: vec![int(1), int(2)],
        else_result: Some(Box::new(int(0))),
        ty: SqlType::int64(),
    };
    assert_eq!(
        renderer.render_expr(&simple).unwrap(),
        "CASE g\n  WHEN 'a' THEN 1\n  WHEN 'b' THEN 2\n  ELSE 0\nEND"
    );
}

#[test]
fn test_nested_binary_operands_are_parenthesized() {
    let dialect = GenericDialect::new();
    let renderer = SqlRenderer::new(&dialect, 70);
    let expr = binary(
        binary(col(None, "a"), BinOp::Plus, int(1)),
        BinOp::Multiply,
        int(2),
    );
    assert_eq!(renderer.render_expr(&expr).unwrap(), "(a + 1) * 2");
}

#[test]
fn test_identifier_quoting_per_dialect() {
    let stmt = SelectStatement {
        select_list: vec![SelectItem {
            expr: col(None, "my col"),
            alias: Some("select".to_string()),
        }],
        from: from_table("t", None),
        ..SelectStatement::default()
    };
    assert_eq!(
        render(&stmt),
        "SELECT \"my col\" AS \"select\"\nFROM t"
    );
    let mysql = MySqlDialect::new();
    assert_eq!(
        SqlRenderer::new(&mysql, 70).render_statement(&stmt).unwrap(),
        "SELECT `my col` AS `select`\nFROM t"
    );
}

#[test]
fn test_string_literals_are_escaped() {
    let dialect = GenericDialect::new();
    let renderer = SqlRenderer::new(&dialect, 70);
    assert_eq!(renderer.render_expr(&string("O'Brien")).unwrap(), "'O''Brien'");
}

#[test]
fn test_unsupported_join_kind() {
    let mysql = MySqlDialect::new();
    let renderer = SqlRenderer::new(&mysql, 70);
    let stmt = SelectStatement {
        select_list: vec![item(SqlExpr::Star { qualifier: None })],
        from: Some(FromClause {
            base: TableRef::Named {
                name: "a".to_string(),
                alias: Some("t0".to_string()),
            },
            joins: vec![JoinClause {
                kind: JoinKind::FullOuter,
                relation: TableRef::Named {
                    name: "b".to_string(),
                    alias: Some("t1".to_string()),
                },
                predicates: vec![binary(col(Some("t0"), "x"), BinOp::Eq, col(Some("t1"), "x"))],
            }],
        }),
        ..SelectStatement::default()
    };
    let err = renderer.render_statement(&stmt).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedConstruct { .. }));
    assert!(SqlRenderer::new(&HiveDialect::new(), 70)
        .render_statement(&stmt)
        .unwrap()
        .contains("FULL OUTER JOIN"));
}

#[test]
fn test_negating_a_negative_operand_is_parenthesized() {
    let dialect = GenericDialect::new();
    let renderer = SqlRenderer::new(&dialect, 70);
    let negate = |expr: SqlExpr| SqlExpr::Unary {
        op: UnOp::Negate,
        expr: Box::new(expr),
    };
    assert_eq!(renderer.render_expr(&negate(int(-5))).unwrap(), "-(-5)");
    assert_eq!(
        renderer.render_expr(&negate(negate(col(None, "c")))).unwrap(),
        "-(-c)"
    );
    assert_eq!(renderer.render_expr(&negate(int(5))).unwrap(), "-5");
}

#[test]
fn test_non_finite_float_literal_is_unsupported() {
    let dialect = GenericDialect::new();
    let renderer = SqlRenderer::new(&dialect, 70);
    let float = |f: f64| SqlExpr::Literal {
        value: LiteralValue::Float(f),
        ty: SqlType::float64(),
    };
    assert_eq!(renderer.render_expr(&float(1.5)).unwrap(), "1.5");
    for f in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
        let err = renderer.render_expr(&float(f)).unwrap_err();
        assert!(matches!(err, CompileError::UnsupportedConstruct { ref dialect, .. } if dialect == "generic"));
    }
}

#[test]
fn test_multi_line_predicate_keeps_its_margin() {
    let exists = SqlExpr::Exists {
        query: Box::new(SelectStatement {
            select_list: vec![item(int(1))],
            from: from_table("bar", None),
            ..SelectStatement::default()
        }),
        negated: false,
    };
    let stmt = SelectStatement {
        select_list: vec![item(SqlExpr::Star { qualifier: None })],
        from: from_table("foo", None),
        where_: vec![exists, binary(col(None, "x"), BinOp::Gt, int(0))],
        ..SelectStatement::default()
    };
    let expected = "\
SELECT *
FROM foo
WHERE (EXISTS (
        SELECT 1
        FROM bar
      )) AND
      (x > 0)";
    assert_eq!(render(&stmt), expected);
}
