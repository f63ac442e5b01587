// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Error types for semantic analysis
//!
//! Only conditions that make a whole fragment unusable are errors. Unresolved
//! names are logged and skipped; ambiguous and misplaced references become
//! [`Diagnostic`](crate::Diagnostic)s.

use schemadiff_ir::{Dialect, SourceSpan};
use thiserror::Error;

/// Result type alias for semantic operations
pub type SemanticResult<T> = Result<T, SemanticError>;

/// Errors that can occur during semantic analysis
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticError {
    /// The fragment contains a construct the walker cannot analyse
    #[error("Unsupported {kind} at {location}")]
    UnsupportedNode { kind: String, location: SourceSpan },

    /// The fragment was parsed for a different dialect family
    #[error("Fragment parsed as {found} cannot be analysed as {expected}")]
    DialectMismatch { expected: Dialect, found: Dialect },

    /// Duplicate table alias in the same scope
    #[error("Duplicate table alias: {0}")]
    DuplicateAlias(String),

    /// Invalid scope reference (e.g., non-existent parent)
    #[error("Invalid scope reference: {0}")]
    InvalidScope(usize),

    /// Analysis was cancelled between statements
    #[error("Analysis cancelled")]
    Cancelled,
}

impl SemanticError {
    /// Whether the error is the cooperative cancellation signal
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SemanticError::Cancelled)
    }
}
