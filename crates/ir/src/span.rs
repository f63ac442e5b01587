// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Source locations and qualified names
//!
//! Every name-bearing node in the IR carries the [`SourceSpan`] of the token it
//! was parsed from, so that references and diagnostics can point back into the
//! original SQL source.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Location of a token or fragment in the SQL source
///
/// Lines and columns are 1-based. A span with `line == 0` is synthetic: it was
/// created by the engine rather than read from source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceSpan {
    /// Byte offset from the start of the source file
    pub offset: usize,
    /// Length in bytes
    pub length: usize,
    /// 1-based line number
    pub line: u32,
    /// 1-based column number
    pub column: u32,
}

impl SourceSpan {
    pub fn new(offset: usize, length: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            length,
            line,
            column,
        }
    }

    /// A span not backed by any source token
    pub fn synthetic() -> Self {
        Self::default()
    }

    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            f.write_str("<synthetic>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

/// An optionally schema-qualified object name (e.g. `public.users`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub name: String,
    pub span: SourceSpan,
}

impl QualifiedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            span: SourceSpan::synthetic(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = span;
        self
    }

    /// Parse a dotted name such as `s.t` (used for string-literal object names)
    pub fn parse_dotted(text: &str, span: SourceSpan) -> Option<Self> {
        let mut parts = text.split('.').map(|p| p.trim().trim_matches('"'));
        let first = parts.next().filter(|p| !p.is_empty())?;
        match (parts.next(), parts.next()) {
            (None, _) => Some(Self::new(first).with_span(span)),
            (Some(second), None) if !second.is_empty() => {
                Some(Self::new(second).with_schema(first).with_span(span))
            }
            _ => None,
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_span() {
        assert!(SourceSpan::synthetic().is_synthetic());
        assert!(!SourceSpan::new(0, 3, 1, 1).is_synthetic());
    }

    #[test]
    fn test_parse_dotted() {
        let span = SourceSpan::new(10, 8, 2, 4);
        let name = QualifiedName::parse_dotted("public.seq", span).unwrap();
        assert_eq!(name.schema.as_deref(), Some("public"));
        assert_eq!(name.name, "seq");
        assert_eq!(name.span, span);

        let bare = QualifiedName::parse_dotted("\"seq\"", span).unwrap();
        assert!(bare.schema.is_none());
        assert_eq!(bare.name, "seq");

        assert!(QualifiedName::parse_dotted("a.b.c", span).is_none());
        assert!(QualifiedName::parse_dotted("", span).is_none());
    }
}
