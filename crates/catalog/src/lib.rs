// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # schemadiff - Catalog Layer
//!
//! This crate provides the read-only metadata view that name resolution
//! consults while analysing SQL fragments. It defines the
//! [`MetadataSnapshot`] trait and an in-memory implementation,
//! [`StaticCatalog`].
//!
//! ## Architecture
//!
//! A snapshot is taken from the loaded database before an analysis phase and
//! is never mutated while launchers read it:
//! - Lookups by optional schema + name, case-insensitive
//! - Unqualified names resolved through a search path
//! - Owned results, so no borrow outlives a lookup
//!
//! ## Metadata Types
//!
//! - [`RelationMetadata`]: tables, views and sequences with their columns
//! - [`ColumnMetadata`]: column name, type name, nullability
//! - [`FunctionMetadata`]: routine signatures and return types
//! - [`OperatorMetadata`]: operator operands and propagated return type
//! - [`TypeMetadata`]: user-defined types and domains

pub mod error;
pub mod metadata;
pub mod r#static;
pub mod r#trait;

// Re-exports
pub use error::{CatalogError, CatalogResult};
pub use metadata::{
    ColumnMetadata, FunctionKind, FunctionMetadata, FunctionParameter, OperatorMetadata,
    RelationKind, RelationMetadata, TypeKind, TypeMetadata,
};
pub use r#static::StaticCatalog;
pub use r#trait::MetadataSnapshot;
