// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # schemadiff - Semantic Analysis Layer
//!
//! This crate resolves the names inside one parsed SQL fragment against a
//! metadata snapshot and reports the schema objects the fragment depends on.
//!
//! ## Core Concepts
//!
//! ### Scopes
//!
//! A [`Scope`] is one level of name visibility: a statement, a SELECT, a
//! set-operation branch or a CTE body. Scopes live in a [`ScopeManager`]
//! arena and reference their parent by index. CTE bodies are local scopes:
//! lookups stop there instead of reaching the outer query.
//!
//! ```rust
//! use schemadiff_semantic::{ColumnSymbol, ScopeManager, ScopeType, TableSymbol};
//!
//! let mut manager = ScopeManager::new();
//! let outer = manager.create_scope(ScopeType::Query, None);
//! let users = TableSymbol::new("users")
//!     .with_alias("u")
//!     .with_columns(vec![ColumnSymbol::new("id", Some("int4"), "users")]);
//! manager.add_table_reference(outer, users).unwrap();
//!
//! let inner = manager.create_scope(ScopeType::Subquery, Some(outer));
//! let found = manager.find_reference(inner, None, "u", Some("id")).unwrap();
//! assert_eq!(found.table.table_name, "users");
//! assert!(!found.ambiguous);
//! assert_eq!(found.column.map(|c| c.name.as_str()), Some("id"));
//! ```
//!
//! ### Walking a fragment
//!
//! [`Walker`] visits a [`ParsedFragment`](schemadiff_ir::ParsedFragment) with
//! dialect rules from a [`DialectOps`] implementation and produces a
//! [`WalkOutput`]: hard dependencies, all references, diagnostics and the
//! output columns of the last row-producing statement.
//!
//! ```rust
//! use schemadiff_catalog::{ColumnMetadata, RelationMetadata, StaticCatalog};
//! use schemadiff_ir::{
//!     Dialect, Expr, ObjectKind, ParsedFragment, QualifiedName, Query, SelectItem,
//!     SelectStatement, TableRef,
//! };
//! use schemadiff_semantic::{PostgresOps, Walker};
//!
//! let catalog = StaticCatalog::new("public").with_relation(
//!     RelationMetadata::new("public", "t").with_columns(vec![ColumnMetadata::new("a", "int4")]),
//! );
//! let query = Query::new(
//!     SelectStatement::new(vec![SelectItem::UnnamedExpr(Expr::column("a"))])
//!         .with_from(vec![TableRef::table(QualifiedName::new("t"))]),
//! );
//! let fragment = ParsedFragment::query(Dialect::PostgreSQL, query);
//!
//! let output = Walker::new(PostgresOps::default(), &catalog)
//!     .analyze(&fragment)
//!     .unwrap();
//! assert!(output.dependencies.depends_on(ObjectKind::Table, Some("public"), "t"));
//! assert_eq!(output.columns[0].data_type.as_deref(), Some("int4"));
//! ```

pub mod diagnostic;
pub mod dialect;
pub mod error;
pub mod scope;
pub mod symbol;
pub mod walker;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use dialect::{accepts_dialect, ClickHouseOps, DialectOps, MsSqlOps, PostgresOps};
pub use error::{SemanticError, SemanticResult};
pub use scope::{ColumnMatch, CteSymbol, Scope, ScopeManager, ScopeType, TableMatch, VariableSymbol};
pub use symbol::{ColumnSymbol, RelationSource, TableSymbol};
pub use walker::{WalkOutput, Walker};
