// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Diagnostics
//!
//! Findings that do not stop analysis: ambiguous references, duplicate
//! aliases, qualifiers naming no FROM entry, and statements that could not be
//! analysed at all. They are collected per fragment and returned with the
//! dependency graph.

use std::fmt;

use schemadiff_ir::SourceSpan;
use serde::{Deserialize, Serialize};

/// Diagnostic code identifying the type of diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Qualifier that names no FROM entry
    UndefinedTable,

    /// Name matching more than one visible relation
    AmbiguousReference,

    /// Alias or table registered twice at one level
    DuplicateAlias,

    /// Statement excluded from the graph after a structural error
    AnalysisFailed,

    /// Custom diagnostic code
    Custom(String),
}

impl DiagnosticCode {
    /// Get the string representation of this diagnostic code
    pub fn as_str(&self) -> String {
        match self {
            DiagnosticCode::UndefinedTable => "SEMANTIC-001".to_string(),
            DiagnosticCode::AmbiguousReference => "SEMANTIC-003".to_string(),
            DiagnosticCode::DuplicateAlias => "SEMANTIC-005".to_string(),
            DiagnosticCode::AnalysisFailed => "ANALYSIS-001".to_string(),
            DiagnosticCode::Custom(s) => s.clone(),
        }
    }

    /// Get a human-readable description of this diagnostic code
    pub fn description(&self) -> String {
        match self {
            DiagnosticCode::UndefinedTable => "Missing FROM-clause entry".to_string(),
            DiagnosticCode::AmbiguousReference => "Ambiguous reference".to_string(),
            DiagnosticCode::DuplicateAlias => "Duplicate table alias".to_string(),
            DiagnosticCode::AnalysisFailed => "Statement analysis failed".to_string(),
            DiagnosticCode::Custom(s) => format!("Custom diagnostic: {}", s),
        }
    }
}

/// Severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(label)
    }
}

/// A finding reported while analysing one fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    pub location: SourceSpan,
    pub code: Option<DiagnosticCode>,
    /// Qualified name of the statement the fragment belongs to
    pub statement: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, severity: Severity, location: SourceSpan) -> Self {
        Self {
            message: message.into(),
            severity,
            location,
            code: None,
            statement: None,
        }
    }

    /// Create an error diagnostic
    pub fn error(message: impl Into<String>, location: SourceSpan) -> Self {
        Self::new(message, Severity::Error, location)
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>, location: SourceSpan) -> Self {
        Self::new(message, Severity::Warning, location)
    }

    /// Create an information diagnostic
    pub fn information(message: impl Into<String>, location: SourceSpan) -> Self {
        Self::new(message, Severity::Info, location)
    }

    /// Set the diagnostic code
    pub fn with_code(mut self, code: DiagnosticCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attribute the diagnostic to a statement
    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.severity, self.location)?;
        if let Some(statement) = &self.statement {
            write!(f, " in {}", statement)?;
        }
        if let Some(code) = &self.code {
            write!(f, " [{}]", code.as_str())?;
        }
        write!(f, ": {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_code_as_str() {
        assert_eq!(DiagnosticCode::UndefinedTable.as_str(), "SEMANTIC-001");
        assert_eq!(DiagnosticCode::AmbiguousReference.as_str(), "SEMANTIC-003");
        assert_eq!(DiagnosticCode::Custom("X-1".to_string()).as_str(), "X-1");
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::warning("Reference \"id\" is ambiguous", SourceSpan::new(7, 2, 1, 8))
            .with_code(DiagnosticCode::AmbiguousReference)
            .with_statement("public.v");
        assert_eq!(
            diagnostic.to_string(),
            "warning at 1:8 in public.v [SEMANTIC-003]: Reference \"id\" is ambiguous"
        );
        assert!(!diagnostic.is_error());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error < Severity::Warning);
        assert!(Diagnostic::error("boom", SourceSpan::synthetic()).is_error());
    }
}
