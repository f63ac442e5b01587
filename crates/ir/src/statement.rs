// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Statements and parsed fragments
//!
//! A [`ParsedFragment`] is what the dialect grammars hand to the dependency
//! engine: the already-parsed tree of the part of a DDL statement that needs
//! semantic analysis, tagged with its dialect and source location.
//!
//! | DDL construct              | fragment node                        |
//! |----------------------------|--------------------------------------|
//! | column default, CHECK      | [`FragmentNode::Expr`]               |
//! | index elements + predicate | [`FragmentNode::Exprs`]              |
//! | trigger `WHEN`             | [`FragmentNode::Expr`]               |
//! | view query                 | [`FragmentNode::Statements`] (one)   |
//! | rule condition + actions   | [`FragmentNode::Statements`]         |
//! | SQL function body          | [`FragmentNode::Statements`]         |

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::expr::{ColumnRef, Expr};
use crate::query::{CommonTableExpr, Query, SelectItem, TableRef};
use crate::span::{QualifiedName, SourceSpan};

/// A parsed SQL statement that can appear inside a view, rule or routine body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Query(Query),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    /// Bare expression statement (`PERFORM`, `RETURN expr`, rule `WHERE`)
    Expr(Expr),
    /// A statement kind the IR does not model
    Unsupported { kind: String, span: SourceSpan },
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub ctes: Vec<CommonTableExpr>,
    pub recursive: bool,
    pub table: QualifiedName,
    pub alias: Option<String>,
    pub columns: Vec<ColumnRef>,
    pub source: InsertSource,
    pub on_conflict: Option<OnConflict>,
    pub returning: Vec<SelectItem>,
}

impl InsertStatement {
    pub fn new(table: QualifiedName, source: InsertSource) -> Self {
        Self {
            ctes: Vec::new(),
            recursive: false,
            table,
            alias: None,
            columns: Vec::new(),
            source,
            on_conflict: None,
            returning: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnRef>) -> Self {
        self.columns = columns;
        self
    }
}

/// Source rows of an INSERT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InsertSource {
    Values(Vec<Vec<Expr>>),
    Query(Box<Query>),
    DefaultValues,
}

/// `ON CONFLICT (...) DO UPDATE SET ...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnConflict {
    pub target: Vec<ColumnRef>,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Expr>,
}

/// `column = value` in UPDATE / ON CONFLICT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: ColumnRef,
    pub value: Expr,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub ctes: Vec<CommonTableExpr>,
    pub recursive: bool,
    pub table: QualifiedName,
    pub alias: Option<String>,
    pub assignments: Vec<Assignment>,
    pub from: Vec<TableRef>,
    pub where_clause: Option<Expr>,
    pub returning: Vec<SelectItem>,
}

impl UpdateStatement {
    pub fn new(table: QualifiedName, assignments: Vec<Assignment>) -> Self {
        Self {
            ctes: Vec::new(),
            recursive: false,
            table,
            alias: None,
            assignments,
            from: Vec::new(),
            where_clause: None,
            returning: Vec::new(),
        }
    }
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub ctes: Vec<CommonTableExpr>,
    pub recursive: bool,
    pub table: QualifiedName,
    pub alias: Option<String>,
    pub using: Vec<TableRef>,
    pub where_clause: Option<Expr>,
    pub returning: Vec<SelectItem>,
}

impl DeleteStatement {
    pub fn new(table: QualifiedName) -> Self {
        Self {
            ctes: Vec::new(),
            recursive: false,
            table,
            alias: None,
            using: Vec::new(),
            where_clause: None,
            returning: Vec::new(),
        }
    }
}

/// The node kinds a fragment can carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FragmentNode {
    Expr(Expr),
    Exprs(Vec<Expr>),
    Statements(Vec<Statement>),
}

impl FragmentNode {
    /// Human-readable node kind, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            FragmentNode::Expr(_) => "expression",
            FragmentNode::Exprs(_) => "expression list",
            FragmentNode::Statements(_) => "statement list",
        }
    }
}

/// An already-parsed SQL fragment awaiting dependency analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFragment {
    pub dialect: Dialect,
    pub node: FragmentNode,
    pub span: SourceSpan,
}

impl ParsedFragment {
    pub fn new(dialect: Dialect, node: FragmentNode) -> Self {
        Self {
            dialect,
            node,
            span: SourceSpan::synthetic(),
        }
    }

    pub fn expr(dialect: Dialect, expr: Expr) -> Self {
        Self::new(dialect, FragmentNode::Expr(expr))
    }

    pub fn query(dialect: Dialect, query: Query) -> Self {
        Self::new(dialect, FragmentNode::Statements(vec![Statement::Query(query)]))
    }

    pub fn statements(dialect: Dialect, statements: Vec<Statement>) -> Self {
        Self::new(dialect, FragmentNode::Statements(statements))
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }
}
