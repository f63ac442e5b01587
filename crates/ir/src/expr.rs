// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Expressions
//!
//! This module represents SQL value expressions in the IR.
//!
//! ## Design
//!
//! Expressions are what column defaults, CHECK constraints, index elements,
//! trigger `WHEN` clauses and every clause of a query are made of. The
//! dependency walker only cares about the nodes that can name a schema object:
//!
//! - **Column references**: `col`, `t.col`, `s.t.col`
//! - **Function calls**: `f(x)`, `s.f(x)`, aggregates, window calls
//! - **Operators**: built-in [`BinaryOp`]s and user-defined `OPERATOR(s.+)`
//! - **Casts and collations**: `x::s.my_type`, `x COLLATE s.c`
//! - **Subqueries**: scalar, `EXISTS`, `IN (SELECT ...)`
//! - **Parameters**: `$1` and named routine arguments
//! - **Dynamic projections**: ClickHouse `COLUMNS('regex')`
//!
//! Everything else (literals, arithmetic, CASE) only contributes through its
//! children.
//!
//! ## Expression Hierarchy
//!
//! ```text
//! BinaryOp {
//!   left: Box<Expr::Column("price")>,
//!   op: Mul,
//!   right: Box<Expr::Function { name: "s.tax_rate", args: [] }>
//! }
//! ```
//!
//! Represents: `price * s.tax_rate()`
//!
//! ## Unsupported nodes
//!
//! Grammars emit [`Expr::Unsupported`] for constructs they parsed but the IR
//! cannot express. The walker treats such a node as a structural error for the
//! whole fragment.

use serde::{Deserialize, Serialize};

use crate::query::{Query, WindowDef};
use crate::span::{QualifiedName, SourceSpan};

/// A SQL expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Column reference (e.g., `table.column` or just `column`)
    Column(ColumnRef),

    /// Literal value
    Literal { value: Literal, span: SourceSpan },

    /// Built-in binary operation (e.g., `a + b`, `x = 5`)
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// Unary operation (e.g., `-x`, `NOT a`)
    UnaryOp { op: UnaryOp, expr: Box<Expr> },

    /// Schema-qualified or user-defined operator (e.g., `a OPERATOR(s.===) b`)
    ///
    /// Prefix operators have no `left` operand.
    Operator {
        name: QualifiedName,
        left: Option<Box<Expr>>,
        right: Option<Box<Expr>>,
    },

    /// Function call (e.g., `COUNT(*)`, `s.f(column)`)
    Function(FunctionCall),

    /// CASE expression
    Case {
        operand: Option<Box<Expr>>,
        conditions: Vec<Expr>,
        results: Vec<Expr>,
        else_result: Option<Box<Expr>>,
    },

    /// CAST expression (`CAST(x AS t)` or `x::t`)
    Cast {
        expr: Box<Expr>,
        type_name: QualifiedName,
    },

    /// COLLATE expression
    Collate {
        expr: Box<Expr>,
        collation: QualifiedName,
    },

    /// Parenthesized expression
    Paren(Box<Expr>),

    /// List of expressions (e.g., for IN clause)
    List(Vec<Expr>),

    /// Scalar subquery
    Subquery(Box<Query>),

    /// EXISTS (subquery)
    Exists(Box<Query>),

    /// `expr [NOT] IN (subquery)`
    InSubquery {
        expr: Box<Expr>,
        query: Box<Query>,
        negated: bool,
    },

    /// Routine parameter (`$1` or a named argument inside a function body)
    Parameter(ParameterRef),

    /// ClickHouse `COLUMNS('pattern')` dynamic column reference
    Columns { pattern: String, span: SourceSpan },

    /// A construct the grammar recognised but the IR does not model
    Unsupported { kind: String, span: SourceSpan },
}

impl Expr {
    /// Shorthand for an unqualified column reference
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::new(name))
    }

    /// Shorthand for a literal without source location
    pub fn literal(value: Literal) -> Self {
        Expr::Literal {
            value,
            span: SourceSpan::synthetic(),
        }
    }

    /// Shorthand for a string literal at a location
    pub fn string(value: impl Into<String>, span: SourceSpan) -> Self {
        Expr::Literal {
            value: Literal::String(value.into()),
            span,
        }
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn call(name: QualifiedName, args: Vec<Expr>) -> Self {
        Expr::Function(FunctionCall::new(name, args))
    }

    pub fn cast(expr: Expr, type_name: QualifiedName) -> Self {
        Expr::Cast {
            expr: Box::new(expr),
            type_name,
        }
    }

    /// Source location of the node, when it has one of its own
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            Expr::Column(col) => Some(col.span),
            Expr::Literal { span, .. } => Some(*span),
            Expr::Operator { name, .. } => Some(name.span),
            Expr::Function(call) => Some(call.name.span),
            Expr::Cast { type_name, .. } => Some(type_name.span),
            Expr::Collate { collation, .. } => Some(collation.span),
            Expr::Parameter(param) => Some(param.span()),
            Expr::Columns { span, .. } | Expr::Unsupported { span, .. } => Some(*span),
            _ => None,
        }
    }
}

/// Column reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Optional schema qualifier (`s.t.col`)
    pub schema: Option<String>,
    /// Optional table/alias name
    pub table: Option<String>,
    /// Column name
    pub column: String,
    /// Location of the column token
    pub span: SourceSpan,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: None,
            column: column.into(),
            span: SourceSpan::synthetic(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    pub fn qualified(&self) -> String {
        match (&self.schema, &self.table) {
            (Some(schema), Some(table)) => format!("{}.{}.{}", schema, table, self.column),
            (None, Some(table)) => format!("{}.{}", table, self.column),
            _ => self.column.clone(),
        }
    }
}

/// Function call node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: QualifiedName,
    pub args: Vec<Expr>,
    pub distinct: bool,
    /// Aggregate `FILTER (WHERE ...)`
    pub filter: Option<Box<Expr>>,
    /// Window specification for `OVER (...)`
    pub over: Option<WindowDef>,
}

impl FunctionCall {
    pub fn new(name: QualifiedName, args: Vec<Expr>) -> Self {
        Self {
            name,
            args,
            distinct: false,
            filter: None,
            over: None,
        }
    }

    pub fn with_over(mut self, over: WindowDef) -> Self {
        self.over = Some(over);
        self
    }
}

/// Routine parameter reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParameterRef {
    /// `$n`, 1-based
    Positional { index: u32, span: SourceSpan },
    /// A named argument used as a variable
    Named { name: String, span: SourceSpan },
}

impl ParameterRef {
    pub fn span(&self) -> SourceSpan {
        match self {
            ParameterRef::Positional { span, .. } | ParameterRef::Named { span, .. } => *span,
        }
    }

    /// Name the parameter is declared under in a scope
    pub fn key(&self) -> String {
        match self {
            ParameterRef::Positional { index, .. } => format!("${}", index),
            ParameterRef::Named { name, .. } => name.clone(),
        }
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Built-in binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logical
    And,
    Or,

    // String
    Concat,
    Like,
    NotLike,
    ILike,
    NotILike,

    // Other
    In,
    NotIn,
    Is,
    IsNot,
}

impl BinaryOp {
    /// Whether the operator always yields a boolean
    pub fn is_predicate(&self) -> bool {
        !matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::Mod
                | BinaryOp::Concat
        )
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
    IsNull,
    IsNotNull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ref() {
        let col = ColumnRef::new("id");
        assert_eq!(col.qualified(), "id");
        assert!(col.table.is_none());

        let qualified = col.with_table("users");
        assert_eq!(qualified.qualified(), "users.id");
        assert_eq!(qualified.table.as_deref(), Some("users"));

        let full = qualified.with_schema("app");
        assert_eq!(full.qualified(), "app.users.id");
    }

    #[test]
    fn test_parameter_key() {
        let positional = ParameterRef::Positional {
            index: 2,
            span: SourceSpan::synthetic(),
        };
        assert_eq!(positional.key(), "$2");
    }

    #[test]
    fn test_expr_span() {
        let span = SourceSpan::new(4, 3, 1, 5);
        let expr = Expr::Column(ColumnRef::new("a").with_span(span));
        assert_eq!(expr.span(), Some(span));
        assert_eq!(Expr::List(vec![]).span(), None);
    }
}
