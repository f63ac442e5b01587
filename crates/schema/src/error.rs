// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Error types for the schema model

use thiserror::Error;

use schemadiff_ir::ObjectKind;

use crate::statement::StatementId;

/// Result type alias for schema model operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while building the schema model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A statement names a parent that was never added
    #[error("Unknown parent statement {0}")]
    UnknownParent(StatementId),

    /// The same object was declared twice
    #[error("{kind} '{schema}.{name}' is already defined")]
    Duplicate {
        kind: ObjectKind,
        schema: String,
        name: String,
    },
}
