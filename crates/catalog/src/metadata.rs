// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata types for schema objects
//!
//! This module re-exports metadata types from the `schemadiff-ir` crate.

// Re-export all metadata types from the ir crate
pub use schemadiff_ir::{
    ColumnMetadata, FunctionKind, FunctionMetadata, FunctionParameter, OperatorMetadata,
    RelationKind, RelationMetadata, TypeKind, TypeMetadata,
};
