use super::*;
use crate::test_utils::*;

#[test]
fn test_output_names() {
    let t = star1();
    assert_eq!(t.col("c").unwrap().output_name(), Some("c"));
    assert_eq!(t.col("f").unwrap().sum().output_name(), Some("sum"));
    assert_eq!(t.col("f").unwrap().mean().output_name(), Some("mean"));
    assert_eq!(
        t.col("f").unwrap().count_distinct().output_name(),
        Some("nunique")
    );
    assert_eq!(
        t.col("f").unwrap().sum().name("total").output_name(),
        Some("total")
    );
    assert_eq!(t.col("c").unwrap().plus(Expr::lit_int(1)).output_name(), None);
}

#[test]
fn test_rename_replaces_alias() {
    let t = star1();
    let e = t.col("c").unwrap().name("a").name("b");
    match e {
        Expr::Alias { expr, name } => {
            assert_eq!(name, "b");
            assert!(matches!(*expr, Expr::Column { .. }));
        }
        other => panic!("expected alias, got {:?}", other),
    }
}

#[test]
fn test_sql_types() {
    let t = star1();
    let c = t.col("c").unwrap();
    assert_eq!(c.sql_type(), SqlType::int64());
    assert_eq!(c.clone().plus(Expr::lit_int(1)).sql_type(), SqlType::int64());
    assert_eq!(
        c.clone().multiply(Expr::lit_float(2.0)).sql_type(),
        SqlType::float64()
    );
    assert_eq!(c.clone().gt(Expr::lit_int(0)).sql_type(), SqlType::Boolean);
    assert_eq!(c.clone().mean().sql_type(), SqlType::float64());
    assert_eq!(c.count().sql_type(), SqlType::int64());
}

#[test]
fn test_float_literals_compare_by_bits() {
    assert_eq!(Expr::lit_float(1.5), Expr::lit_float(1.5));
    assert_ne!(Expr::lit_float(0.0), Expr::lit_float(-0.0));
    assert_ne!(Expr::lit_int(1), Expr::lit_float(1.0));
}

#[test]
fn test_split_conjunction() {
    let t = star1();
    let a = t.col("c").unwrap().gt(Expr::lit_int(0));
    let b = t.col("f").unwrap().lt(Expr::lit_int(1));
    let c = t.col("foo_id").unwrap().eq(Expr::lit_str("x"));
    let terms = a.clone().and(b.clone()).and(c.clone()).split_conjunction();
    assert_eq!(terms, vec![a, b, c]);
}

#[test]
fn test_referenced_relations_in_order() {
    let t1 = star1();
    let t2 = star2();
    let pred = t2
        .col("foo_id")
        .unwrap()
        .eq(t1.col("foo_id").unwrap())
        .and(t1.col("c").unwrap().gt(Expr::lit_int(0)));
    assert_eq!(pred.referenced_relations(), vec![t2, t1]);
}

#[test]
fn test_case_requires_a_branch() {
    assert!(Expr::searched_case(vec![], None).is_err());
    let t = alltypes();
    let case = Expr::simple_case(
        t.col("g").unwrap(),
        vec![(Expr::lit_str("foo"), Expr::lit_str("bar"))],
        None,
    )
    .unwrap();
    assert_eq!(case.sql_type(), SqlType::String);
}

#[test]
fn test_topk_defaults_to_count() {
    let t = star1();
    let topk = t.col("foo_id").unwrap().topk(10, None).unwrap();
    match topk {
        Expr::TopK(topk) => {
            assert_eq!(topk.k, 10);
            assert_eq!(topk.metric, Expr::count_star());
            assert_eq!(topk.key_name().unwrap(), "foo_id");
            assert_eq!(topk.rel, t);
        }
        other => panic!("expected top-k, got {:?}", other),
    }
}

#[test]
fn test_topk_needs_column_key() {
    let err = Expr::lit_int(1).topk(3, None).unwrap_err();
    assert!(matches!(err, CompileError::InvalidPlan { .. }));
}

#[test]
fn test_topk_to_aggregation_shape() {
    let t = star1();
    let topk = t.col("foo_id").unwrap().topk(5, None).unwrap();
    let Expr::TopK(topk) = topk else {
        panic!("expected top-k");
    };
    let limited = topk.to_aggregation().unwrap();
    match limited.op() {
        crate::ir::plan::RelOp::Limit { input, n, offset } => {
            assert_eq!((*n, *offset), (5, 0));
            assert!(matches!(
                input.op(),
                crate::ir::plan::RelOp::Sort { keys, .. } if !keys[0].ascending
            ));
        }
        other => panic!("expected limit, got {:?}", other),
    }
    assert_eq!(limited.schema().column_names(), vec!["foo_id", "count"]);
}

#[test]
fn test_scalar_subquery_needs_one_column() {
    let t = star1();
    assert!(Expr::scalar_subquery(t.clone()).is_err());
    let reduced = t.reduce(t.col("f").unwrap().max()).unwrap();
    assert_eq!(reduced.sql_type(), SqlType::float64());
}

#[test]
fn test_map_plans_visits_slots() {
    let outer = foo_t();
    let inner = bar_t();
    let exists = Expr::exists(
        &outer,
        &inner,
        vec![outer.col("key1").unwrap().eq(inner.col("key1").unwrap())],
        false,
    );
    let mut seen = Vec::new();
    exists
        .map_plans(&mut |plan, slot| {
            seen.push((plan.clone(), slot));
            Ok(plan.clone())
        })
        .unwrap();
    assert_eq!(seen[0], (outer.clone(), PlanSlot::Reference));
    assert_eq!(seen[1], (inner.clone(), PlanSlot::Position));
    assert_eq!(seen.len(), 4);
}

#[test]
fn test_transform_replaces_columns() {
    let t = star1();
    let u = star2();
    let pred = t.col("foo_id").unwrap().eq(Expr::lit_str("x"));
    let replaced = pred
        .transform(&mut |e| {
            Ok(match e {
                Expr::Column { name, .. } => Some(u.col(name)?),
                _ => None,
            })
        })
        .unwrap();
    assert_eq!(replaced.referenced_relations(), vec![u]);
}

#[test]
fn test_prefix_and_suffix_matches_build_like_patterns() {
    let t = star1();
    let starts = t.col("foo_id").unwrap().startswith("foo");
    assert_eq!(starts.sql_type(), SqlType::Boolean);
    let Expr::BinaryOp { op, right, .. } = &starts else {
        panic!("expected LIKE, got {:?}", starts);
    };
    assert_eq!(*op, BinOp::Like);
    assert_eq!(
        **right,
        Expr::func(
            "concat",
            vec![Expr::lit_str("foo"), Expr::lit_str("%")],
            SqlType::String
        )
    );

    let ends = t.col("foo_id").unwrap().endswith("bar");
    assert!(matches!(&ends, Expr::BinaryOp { op: BinOp::Like, .. }));
    assert_eq!(BinOp::NotLike.to_string(), "NOT LIKE");
    assert!(BinOp::NotLike.is_comparison());
}
