// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Query Representation
//!
//! This module represents SQL queries in the IR.
//!
//! ## Query Structure
//!
//! A [`Query`] consists of:
//!
//! - **CTEs**: Common Table Expressions (WITH clauses), optionally `RECURSIVE`
//! - **Body**: The main query (SELECT or set operation)
//! - **ORDER BY**, **LIMIT**, **OFFSET**
//!
//! ## Set Operations
//!
//! [`SetOp`] forms a tree of `UNION`/`INTERSECT`/`EXCEPT` nodes whose leaves are
//! [`SelectStatement`]s. The output column names of a set operation are those
//! of its leftmost branch.
//!
//! ## FROM items
//!
//! [`TableRef`] is one comma-separated FROM item together with the joins chained
//! onto it. Its [`TableFactor`] is a named relation, a derived table
//! (subquery, optionally `LATERAL`), a set-returning function call, or a
//! parenthesised nested join.
//!
//! ```sql
//! FROM s.users u
//!   LEFT JOIN orders o ON u.id = o.user_id
//!   CROSS JOIN LATERAL (SELECT max(total) FROM payments p WHERE p.user_id = u.id) m
//!   , generate_series(1, 10) g
//! ```
//!
//! ## Common Table Expressions (CTEs)
//!
//! ```sql
//! WITH RECURSIVE hierarchy AS (
//!   SELECT id, parent_id FROM categories WHERE parent_id IS NULL
//!   UNION ALL
//!   SELECT c.id, c.parent_id FROM categories c JOIN hierarchy h ON c.parent_id = h.id
//! )
//! SELECT * FROM hierarchy
//! ```
//!
//! A CTE name is visible to the query that declares it and to everything nested
//! below it, never to an enclosing statement.

use serde::{Deserialize, Serialize};

use crate::expr::{Expr, FunctionCall};
use crate::span::{QualifiedName, SourceSpan};

/// A SQL query (SELECT statement or set operation)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// The main body of the query
    pub body: SetOp,

    /// Optional ORDER BY clause
    pub order_by: Option<Vec<OrderBy>>,

    /// Optional LIMIT clause
    pub limit: Option<Expr>,

    /// Optional OFFSET clause
    pub offset: Option<Expr>,

    /// Optional WITH clause (CTE)
    pub ctes: Vec<CommonTableExpr>,

    /// `WITH RECURSIVE`
    pub recursive: bool,
}

impl Query {
    pub fn new(select: SelectStatement) -> Self {
        Self {
            body: SetOp::Select(Box::new(select)),
            order_by: None,
            limit: None,
            offset: None,
            ctes: Vec::new(),
            recursive: false,
        }
    }

    pub fn from_set_op(body: SetOp) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn with_ctes(mut self, ctes: impl IntoIterator<Item = CommonTableExpr>) -> Self {
        self.ctes = ctes.into_iter().collect();
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_limit(mut self, limit: Expr) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: Expr) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = Some(order_by);
        self
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::new(SelectStatement::default())
    }
}

/// Set operation (UNION, INTERSECT, EXCEPT) or SELECT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SetOp {
    /// SELECT statement
    Select(Box<SelectStatement>),

    /// UNION [ALL | DISTINCT]
    Union {
        left: Box<Query>,
        right: Box<Query>,
        all: bool,
    },

    /// INTERSECT [DISTINCT]
    Intersect {
        left: Box<Query>,
        right: Box<Query>,
        distinct: bool,
    },

    /// EXCEPT [DISTINCT]
    Except {
        left: Box<Query>,
        right: Box<Query>,
        distinct: bool,
    },

    /// VALUES (...), (...)
    Values(Vec<Vec<Expr>>),
}

impl SetOp {
    pub fn union(left: Query, right: Query, all: bool) -> Self {
        SetOp::Union {
            left: Box::new(left),
            right: Box::new(right),
            all,
        }
    }
}

/// SELECT statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    /// SELECT DISTINCT or ALL
    pub distinct: bool,

    /// Projection list (columns to select)
    pub projection: Vec<SelectItem>,

    /// FROM clause
    pub from: Vec<TableRef>,

    /// WHERE clause
    pub where_clause: Option<Expr>,

    /// GROUP BY clause
    pub group_by: Vec<Expr>,

    /// HAVING clause
    pub having: Option<Expr>,

    /// WINDOW clause
    pub window: Vec<WindowDef>,
}

impl SelectStatement {
    pub fn new(projection: Vec<SelectItem>) -> Self {
        Self {
            projection,
            ..Self::default()
        }
    }

    pub fn with_from(mut self, from: Vec<TableRef>) -> Self {
        self.from = from;
        self
    }

    pub fn with_where(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(predicate);
        self
    }
}

/// Item in a SELECT projection list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectItem {
    /// Unnamed expression (e.g., `column` or `a + b`)
    UnnamedExpr(Expr),

    /// Expression with alias (e.g., `col AS name`)
    AliasedExpr { expr: Expr, alias: String },

    /// Qualified wildcard (e.g., `table.*`)
    QualifiedWildcard { table: String, span: SourceSpan },

    /// Unqualified wildcard (`*`)
    Wildcard,
}

/// FROM item with its chained joins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRef {
    /// What is being selected from
    pub factor: TableFactor,

    /// Alias
    pub alias: Option<String>,

    /// Joins
    pub joins: Vec<Join>,
}

impl TableRef {
    /// A plain named relation
    pub fn table(name: QualifiedName) -> Self {
        Self {
            factor: TableFactor::Table(name),
            alias: None,
            joins: Vec::new(),
        }
    }

    pub fn derived(subquery: Query, lateral: bool) -> Self {
        Self {
            factor: TableFactor::Derived {
                subquery: Box::new(subquery),
                lateral,
            },
            alias: None,
            joins: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn join(mut self, join_type: JoinType, table: TableRef, condition: JoinCondition) -> Self {
        self.joins.push(Join {
            join_type,
            table,
            condition,
        });
        self
    }
}

/// The relation part of a FROM item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableFactor {
    /// Named table, view or CTE
    Table(QualifiedName),

    /// Subquery in FROM
    Derived { subquery: Box<Query>, lateral: bool },

    /// Set-returning function in FROM
    Function(FunctionCall),

    /// Parenthesised join tree
    Nested(Box<TableRef>),
}

/// JOIN clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// Join type
    pub join_type: JoinType,

    /// Table to join
    pub table: TableRef,

    /// Join condition (ON or USING)
    pub condition: JoinCondition,
}

/// Join type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// Join condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinCondition {
    On(Expr),
    Using(Vec<String>),
    Natural,
    None,
}

/// ORDER BY item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: Option<SortDirection>,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Common Table Expression (CTE)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonTableExpr {
    pub name: String,
    pub columns: Vec<String>,
    pub query: Box<Query>,
    pub materialized: Option<bool>,
    pub span: SourceSpan,
}

impl CommonTableExpr {
    pub fn new(name: impl Into<String>, query: Query) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            query: Box::new(query),
            materialized: None,
            span: SourceSpan::synthetic(),
        }
    }
}

/// Window definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowDef {
    pub name: Option<String>,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderBy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_creation() {
        let query = Query::default();
        assert!(query.ctes.is_empty());
        assert!(!query.recursive);
        assert!(matches!(query.body, SetOp::Select(_)));
    }

    #[test]
    fn test_table_ref_builder() {
        let from = TableRef::table(QualifiedName::new("users"))
            .with_alias("u")
            .join(
                JoinType::Left,
                TableRef::table(QualifiedName::new("orders")).with_alias("o"),
                JoinCondition::Using(vec!["user_id".to_string()]),
            );
        assert_eq!(from.alias.as_deref(), Some("u"));
        assert_eq!(from.joins.len(), 1);
        assert_eq!(from.joins[0].join_type, JoinType::Left);
    }
}
