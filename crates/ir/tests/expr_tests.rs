// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Unit tests for IR Expression representation

use schemadiff_ir::{
    BinaryOp, ColumnRef, Expr, FunctionCall, Literal, ParameterRef, QualifiedName, Query,
    SourceSpan, UnaryOp,
};

#[test]
fn test_expr_column_ref() {
    let col = Expr::column("id");
    assert!(matches!(col, Expr::Column(ref c) if c.column == "id"));
}

#[test]
fn test_column_ref_with_table() {
    let col = ColumnRef::new("id").with_table("users");
    assert_eq!(col.column, "id");
    assert_eq!(col.table, Some("users".to_string()));
    assert!(col.schema.is_none());
}

#[test]
fn test_expr_literal_string() {
    let span = SourceSpan::new(8, 5, 1, 9);
    let lit = Expr::string("seq", span);
    if let Expr::Literal { value: Literal::String(s), span: at } = lit {
        assert_eq!(s, "seq");
        assert_eq!(at, span);
    } else {
        panic!("expected string literal");
    }
}

#[test]
fn test_expr_binary_op_predicate() {
    let expr = Expr::binary(
        Expr::column("price"),
        BinaryOp::Gt,
        Expr::literal(Literal::Integer(0)),
    );
    if let Expr::BinaryOp { op, .. } = expr {
        assert!(op.is_predicate());
    }
    assert!(!BinaryOp::Concat.is_predicate());
}

#[test]
fn test_expr_unary_op() {
    let expr = Expr::UnaryOp {
        op: UnaryOp::IsNull,
        expr: Box::new(Expr::column("deleted_at")),
    };
    assert!(matches!(
        expr,
        Expr::UnaryOp {
            op: UnaryOp::IsNull,
            ..
        }
    ));
}

#[test]
fn test_expr_function_call_qualified() {
    let name = QualifiedName::new("tax_rate")
        .with_schema("billing")
        .with_span(SourceSpan::new(20, 8, 2, 3));
    let call = Expr::call(name.clone(), vec![Expr::column("region")]);

    assert_eq!(call.span(), Some(name.span));
    if let Expr::Function(FunctionCall { name, args, .. }) = call {
        assert_eq!(name.to_string(), "billing.tax_rate");
        assert_eq!(args.len(), 1);
    }
}

#[test]
fn test_expr_cast_span_is_type_span() {
    let type_span = SourceSpan::new(5, 7, 1, 6);
    let cast = Expr::cast(
        Expr::column("a"),
        QualifiedName::new("money").with_schema("s").with_span(type_span),
    );
    assert_eq!(cast.span(), Some(type_span));
}

#[test]
fn test_expr_subquery_has_no_own_span() {
    let expr = Expr::Exists(Box::new(Query::default()));
    assert_eq!(expr.span(), None);
}

#[test]
fn test_parameter_ref_keys() {
    let named = ParameterRef::Named {
        name: "p_id".to_string(),
        span: SourceSpan::synthetic(),
    };
    assert_eq!(named.key(), "p_id");

    let positional = ParameterRef::Positional {
        index: 1,
        span: SourceSpan::synthetic(),
    };
    assert_eq!(positional.key(), "$1");
}

#[test]
fn test_column_ref_qualified() {
    let col = ColumnRef::new("id").with_table("users").with_schema("app");
    assert_eq!(col.qualified(), "app.users.id");
}

#[test]
fn test_expr_serde() {
    let expr = Expr::Columns {
        pattern: "^amount_".to_string(),
        span: SourceSpan::new(0, 18, 1, 8),
    };
    let json = serde_json::to_string(&expr).unwrap();
    let back: Expr = serde_json::from_str(&json).unwrap();
    assert_eq!(back, expr);
}
