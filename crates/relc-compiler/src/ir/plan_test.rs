use super::*;
use crate::test_utils::*;
use relc_sql::SqlType;

#[test]
fn test_structural_equality_is_independent_of_identity() {
    let a = star1().filter(vec![star1().col("c").unwrap().gt(Expr::lit_int(0))]);
    let b = star1().filter(vec![star1().col("c").unwrap().gt(Expr::lit_int(0))]);
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(!a.ptr_eq(&b));
    assert_eq!(a, b);
    assert_eq!(a.structural_hash(), b.structural_hash());
}

#[test]
fn test_different_plans_differ() {
    let t = star1();
    let a = t.limit(10, 0).unwrap();
    let b = t.limit(20, 0).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_views_are_distinct_occurrences_of_equal_structure() {
    let t = star1();
    let v1 = t.view();
    let v2 = t.view();
    assert!(!v1.ptr_eq(&v2));
    assert_ne!(v1.occurrence(), v2.occurrence());
    assert_eq!(v1, v2);
    assert_eq!(v1.structural_hash(), v2.structural_hash());
    assert_ne!(v1, t);
    assert_eq!(v1.schema(), t.schema());
}

#[test]
fn test_plans_containing_views_compare_structurally() {
    let build = || {
        let t = star1();
        let view = t.view();
        t.inner_join(&view, vec![t.col("c").unwrap().eq(view.col("c").unwrap())])
            .unwrap()
    };
    let (a, b) = (build(), build());
    assert!(!a.ptr_eq(&b));
    assert_eq!(a, b);
}

#[test]
fn test_unbound_tables_get_unique_names() {
    let schema = RelSchema::from_pairs([("a", SqlType::int64())]).unwrap();
    let a = Plan::unbound_table(schema.clone()).unwrap();
    let b = Plan::unbound_table(schema).unwrap();
    assert_ne!(a, b);
    match a.op() {
        RelOp::UnboundTable { name, .. } => assert!(name.starts_with("unbound_table_")),
        other => panic!("expected unbound table, got {:?}", other),
    }
}

#[test]
fn test_projection_schema_expands_star() {
    let t = star1();
    let proj = t
        .project(vec![
            t.star(),
            t.col("c").unwrap().multiply(Expr::lit_int(2)).name("c2"),
        ])
        .unwrap();
    assert_eq!(
        proj.schema().column_names(),
        vec!["c", "f", "foo_id", "bar_id", "c2"]
    );
}

#[test]
fn test_projection_duplicate_names_rejected() {
    let t = star1();
    let err = t
        .project(vec![t.star(), t.col("f").unwrap()])
        .unwrap_err();
    assert!(matches!(err, CompileError::DuplicateOutputName { ref name } if name == "f"));
}

#[test]
fn test_projection_unnamed_expression_rejected() {
    let t = star1();
    let err = t
        .project(vec![t.col("c").unwrap().plus(Expr::lit_int(1))])
        .unwrap_err();
    assert!(matches!(err, CompileError::InvalidPlan { .. }));
}

#[test]
fn test_join_requires_predicates() {
    let err = star1().inner_join(&star2(), vec![]).unwrap_err();
    assert!(matches!(err, CompileError::InvalidPlan { .. }));
    assert!(star1().cross_join(&star2()).is_ok());
}

#[test]
fn test_join_schemas() {
    let t1 = star1();
    let t2 = star2();
    let pred = t1.col("foo_id").unwrap().eq(t2.col("foo_id").unwrap());
    let inner = t1.inner_join(&t2, vec![pred.clone()]).unwrap();
    assert_eq!(inner.schema().len(), 7);

    let semi = t1.semi_join(&t2, vec![pred.clone()]).unwrap();
    assert_eq!(semi.schema(), t1.schema());

    let left = t1.left_join(&t2, vec![pred]).unwrap();
    let value1 = left.schema().find_column("value1").unwrap();
    assert_eq!(value1.nullability, Nullability::Nullable);
}

#[test]
fn test_set_op_column_count() {
    let t1 = star1();
    let t2 = star2();
    assert!(t1.union(&t2).is_err());
    assert!(t2.union_all(&t2.view()).is_ok());
}

#[test]
fn test_aggregation_schema_and_invariants() {
    let t = star1();
    let agg = t
        .aggregate(
            vec![t.col("foo_id").unwrap()],
            vec![t.col("f").unwrap().sum().name("total")],
        )
        .unwrap();
    assert_eq!(agg.schema().column_names(), vec!["foo_id", "total"]);
    assert!(t.aggregate(vec![], vec![]).is_err());
}

#[test]
fn test_col_missing_column() {
    let err = star1().col("missing").unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[test]
fn test_with_inputs_checks_arity() {
    let t = star1();
    let lim = t.limit(1, 0).unwrap();
    assert!(lim.op().with_inputs(vec![]).is_err());
    let rebuilt = Plan::new(lim.op().with_inputs(vec![star1()]).unwrap()).unwrap();
    assert_eq!(rebuilt, lim);
}
