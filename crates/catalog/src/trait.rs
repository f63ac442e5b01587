// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata snapshot trait
//!
//! This module defines the read-only lookup interface that name resolution
//! consults while a fragment is being analysed.

use std::sync::Arc;

use crate::error::{CatalogError, CatalogResult};
use crate::metadata::{
    ColumnMetadata, FunctionMetadata, OperatorMetadata, RelationMetadata, TypeMetadata,
};

/// Read-only view of the schema objects already known to the loader
///
/// Lookups take an optional schema; an unqualified lookup searches the
/// implementation's search path. Names are matched case-insensitively and
/// results are returned by value so that callers never hold a borrow into the
/// snapshot.
///
/// The trait itself carries no `Send`/`Sync` bound: a snapshot that is shared
/// with the worker pool must be `Send + Sync`, while the orchestrator's
/// on-demand view provider is deliberately confined to one thread.
///
/// # Examples
///
/// ```rust
/// use schemadiff_catalog::{MetadataSnapshot, StaticCatalog, RelationMetadata};
///
/// let catalog = StaticCatalog::new("public")
///     .with_relation(RelationMetadata::new("public", "users"));
/// assert!(catalog.find_relation(None, "users").is_some());
/// assert!(catalog.find_relation(Some("audit"), "users").is_none());
/// ```
pub trait MetadataSnapshot {
    /// Schema used for unqualified names when nothing else matches
    fn default_schema(&self) -> &str;

    /// Find a table, view or sequence
    fn find_relation(&self, schema: Option<&str>, name: &str) -> Option<RelationMetadata>;

    /// Find a function, procedure or aggregate
    ///
    /// When a name is overloaded the first declared overload is returned.
    fn find_function(&self, schema: Option<&str>, name: &str) -> Option<FunctionMetadata>;

    /// Find an operator by its symbol
    fn find_operator(&self, schema: Option<&str>, name: &str) -> Option<OperatorMetadata>;

    /// Find a user-defined type or domain
    fn find_type(&self, schema: Option<&str>, name: &str) -> Option<TypeMetadata>;

    /// Get column metadata for a relation
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::RelationNotFound` if the relation doesn't exist.
    fn get_columns(&self, schema: Option<&str>, name: &str) -> CatalogResult<Vec<ColumnMetadata>> {
        self.find_relation(schema, name)
            .map(|relation| relation.columns)
            .ok_or_else(|| {
                CatalogError::RelationNotFound(
                    name.to_string(),
                    schema.unwrap_or(self.default_schema()).to_string(),
                )
            })
    }
}

impl<T: MetadataSnapshot + ?Sized> MetadataSnapshot for Arc<T> {
    fn default_schema(&self) -> &str {
        (**self).default_schema()
    }

    fn find_relation(&self, schema: Option<&str>, name: &str) -> Option<RelationMetadata> {
        (**self).find_relation(schema, name)
    }

    fn find_function(&self, schema: Option<&str>, name: &str) -> Option<FunctionMetadata> {
        (**self).find_function(schema, name)
    }

    fn find_operator(&self, schema: Option<&str>, name: &str) -> Option<OperatorMetadata> {
        (**self).find_operator(schema, name)
    }

    fn find_type(&self, schema: Option<&str>, name: &str) -> Option<TypeMetadata> {
        (**self).find_type(schema, name)
    }
}
