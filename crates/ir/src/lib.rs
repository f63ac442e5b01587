// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # schemadiff - Intermediate Representation
//!
//! This crate provides the already-parsed representation of the SQL fragments
//! the dependency engine analyses, together with the values the engine
//! produces. The IR is designed to:
//! - Be dialect-agnostic (PostgreSQL family, ClickHouse, SQL Server)
//! - Carry a source location on every name-bearing node
//! - Mark constructs the grammars could not lower as `Unsupported` instead of
//!   dropping them silently
//!
//! Dependency edges are expressed as [`ObjectReference`] values collected into
//! an insertion-ordered [`DependencySet`].

pub mod dialect;
pub mod expr;
pub mod metadata;
pub mod query;
pub mod reference;
pub mod span;
pub mod statement;

// Re-export commonly used types
pub use dialect::{Dialect, DialectFamily, ParseDialectError};
pub use expr::{BinaryOp, ColumnRef, Expr, FunctionCall, Literal, ParameterRef, UnaryOp};
pub use metadata::{
    ColumnMetadata, FunctionKind, FunctionMetadata, FunctionParameter, OperatorMetadata,
    RelationKind, RelationMetadata, TypeKind, TypeMetadata,
};
pub use query::{
    CommonTableExpr, Join, JoinCondition, JoinType, OrderBy, Query, SelectItem, SelectStatement,
    SetOp, SortDirection, TableFactor, TableRef, WindowDef,
};
pub use reference::{DependencySet, ObjectKind, ObjectReference};
pub use span::{QualifiedName, SourceSpan};
pub use statement::{
    Assignment, DeleteStatement, FragmentNode, InsertSource, InsertStatement, OnConflict,
    ParsedFragment, Statement, UpdateStatement,
};
