// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Unit tests for IR Query representation

use schemadiff_ir::{
    BinaryOp, ColumnRef, CommonTableExpr, Dialect, Expr, FragmentNode, InsertSource,
    InsertStatement, JoinCondition, JoinType, Literal, OrderBy, ParsedFragment, QualifiedName,
    Query, SelectItem, SelectStatement, SetOp, SortDirection, Statement, TableFactor, TableRef,
};

#[test]
fn test_query_with_limit() {
    let query = Query::default()
        .with_limit(Expr::literal(Literal::Integer(10)))
        .with_offset(Expr::literal(Literal::Integer(20)));

    assert!(query.limit.is_some());
    assert!(query.offset.is_some());
}

#[test]
fn test_query_with_order_by() {
    let order_by = vec![OrderBy {
        expr: Expr::Column(ColumnRef::new("id")),
        direction: Some(SortDirection::Asc),
    }];

    let query = Query::default().with_order_by(order_by);
    assert_eq!(query.order_by.as_ref().map(Vec::len), Some(1));
}

#[test]
fn test_select_statement_with_from() {
    let select = SelectStatement::new(vec![SelectItem::Wildcard])
        .with_from(vec![TableRef::table(QualifiedName::new("users"))])
        .with_where(Expr::binary(
            Expr::column("id"),
            BinaryOp::Eq,
            Expr::literal(Literal::Integer(1)),
        ));

    assert_eq!(select.from.len(), 1);
    assert!(matches!(select.from[0].factor, TableFactor::Table(_)));
    assert!(select.where_clause.is_some());
}

#[test]
fn test_table_ref_with_joins() {
    let from = TableRef::table(QualifiedName::new("orders").with_schema("shop"))
        .with_alias("o")
        .join(
            JoinType::Inner,
            TableRef::table(QualifiedName::new("customers")).with_alias("c"),
            JoinCondition::On(Expr::binary(
                Expr::Column(ColumnRef::new("customer_id").with_table("o")),
                BinaryOp::Eq,
                Expr::Column(ColumnRef::new("id").with_table("c")),
            )),
        )
        .join(
            JoinType::Cross,
            TableRef::derived(Query::default(), true).with_alias("m"),
            JoinCondition::None,
        );

    assert_eq!(from.joins.len(), 2);
    assert!(matches!(
        from.joins[1].table.factor,
        TableFactor::Derived { lateral: true, .. }
    ));
}

#[test]
fn test_union_query() {
    let left = Query::new(SelectStatement::new(vec![SelectItem::UnnamedExpr(
        Expr::column("a"),
    )]));
    let right = Query::new(SelectStatement::new(vec![SelectItem::UnnamedExpr(
        Expr::column("b"),
    )]));
    let query = Query::from_set_op(SetOp::union(left, right, true));

    assert!(matches!(query.body, SetOp::Union { all: true, .. }));
}

#[test]
fn test_query_with_ctes() {
    let query = Query::default()
        .with_ctes(vec![CommonTableExpr::new("user_counts", Query::default())])
        .with_recursive(true);

    assert_eq!(query.ctes.len(), 1);
    assert_eq!(query.ctes[0].name, "user_counts");
    assert!(query.recursive);
}

#[test]
fn test_fragment_for_rule_actions() {
    let insert = InsertStatement::new(
        QualifiedName::new("audit").with_schema("log"),
        InsertSource::Values(vec![vec![Expr::column("id")]]),
    )
    .with_columns(vec![ColumnRef::new("row_id")]);

    let fragment = ParsedFragment::statements(
        Dialect::PostgreSQL,
        vec![Statement::Insert(insert), Statement::Query(Query::default())],
    );

    match fragment.node {
        FragmentNode::Statements(ref statements) => assert_eq!(statements.len(), 2),
        ref other => panic!("unexpected node {}", other.kind_name()),
    }
}
