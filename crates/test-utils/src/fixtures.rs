// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! IR fixtures
//!
//! Parsers are outside this workspace, so tests write fragments directly in
//! the IR. These helpers keep that short.

use schemadiff_ir::{
    BinaryOp, ColumnRef, Dialect, Expr, FragmentNode, Literal, ParameterRef, ParsedFragment,
    QualifiedName, Query, SelectItem, SelectStatement, SourceSpan, Statement, TableRef,
};

/// Builders for parsed fragments
pub struct IrFixtures;

impl IrFixtures {
    // ===== Names and references =====

    /// Unqualified column `name`
    pub fn col(name: &str) -> Expr {
        Expr::column(name)
    }

    /// Column `table.name`
    pub fn qcol(table: &str, name: &str) -> Expr {
        Expr::Column(ColumnRef::new(name).with_table(table))
    }

    /// Positional routine parameter `$index`
    pub fn param(index: u32) -> Expr {
        Expr::Parameter(ParameterRef::Positional {
            index,
            span: SourceSpan::synthetic(),
        })
    }

    pub fn int(value: i64) -> Expr {
        Expr::literal(Literal::Integer(value))
    }

    pub fn eq(left: Expr, right: Expr) -> Expr {
        Expr::binary(left, BinaryOp::Eq, right)
    }

    /// Call of a possibly dotted function name (`f` or `s.f`)
    pub fn call(name: &str, args: Vec<Expr>) -> Expr {
        Expr::call(Self::name(name), args)
    }

    /// `s.t` or `t` as a qualified name
    pub fn name(dotted: &str) -> QualifiedName {
        QualifiedName::parse_dotted(dotted, SourceSpan::synthetic())
            .unwrap_or_else(|| QualifiedName::new(dotted))
    }

    // ===== Queries =====

    /// FROM item for a possibly dotted relation name
    pub fn table(name: &str) -> TableRef {
        TableRef::table(Self::name(name))
    }

    /// `SELECT <exprs> FROM <tables>`
    pub fn select(exprs: Vec<Expr>, from: Vec<TableRef>) -> Query {
        let projection = exprs.into_iter().map(SelectItem::UnnamedExpr).collect();
        Query::new(SelectStatement::new(projection).with_from(from))
    }

    /// `SELECT * FROM <tables>`
    pub fn select_all(from: Vec<TableRef>) -> Query {
        Query::new(SelectStatement::new(vec![SelectItem::Wildcard]).with_from(from))
    }

    // ===== Fragments =====

    pub fn query_fragment(query: Query) -> ParsedFragment {
        ParsedFragment::query(Dialect::PostgreSQL, query)
    }

    pub fn expr_fragment(expr: Expr) -> ParsedFragment {
        ParsedFragment::expr(Dialect::PostgreSQL, expr)
    }

    /// Routine body made of bare statements
    pub fn body_fragment(statements: Vec<Statement>) -> ParsedFragment {
        ParsedFragment::statements(Dialect::PostgreSQL, statements)
    }

    /// An expression the walker cannot analyse
    pub fn unsupported(kind: &str) -> ParsedFragment {
        ParsedFragment::new(
            Dialect::PostgreSQL,
            FragmentNode::Expr(Expr::Unsupported {
                kind: kind.to_string(),
                span: SourceSpan::new(0, kind.len(), 1, 1),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_names() {
        let name = IrFixtures::name("app.orders");
        assert_eq!(name.schema.as_deref(), Some("app"));
        assert_eq!(name.name, "orders");
        assert!(IrFixtures::name("orders").schema.is_none());
    }
}
