// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Schema statements
//!
//! A [`SchemaStatement`] is one object of the loaded schema: a table, a view,
//! a routine, a constraint. The loader creates it with whatever the DDL states
//! directly; the dependency engine completes it with the dependencies it
//! discovers and, for views, the output columns it infers.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use schemadiff_ir::{
    ColumnMetadata, DependencySet, FunctionParameter, ObjectKind, ObjectReference,
    QualifiedName, SourceSpan,
};

/// Index of a statement in its [`Database`](crate::Database)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatementId(pub usize);

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A schema object together with its resolved dependencies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaStatement {
    /// Position in the owning database, assigned on insertion
    pub id: StatementId,
    pub kind: ObjectKind,
    pub schema: String,
    pub name: String,
    /// Containing statement (the table of a constraint, index or trigger)
    pub parent: Option<StatementId>,
    /// Location of the defining DDL
    pub location: SourceSpan,
    /// Table columns, or inferred view columns once analysed
    pub columns: Vec<ColumnMetadata>,
    /// Routine arguments; for operators the left and right operand types
    pub arguments: Vec<FunctionParameter>,
    pub return_type: Option<String>,
    /// Implementing function of an operator or aggregate
    pub implementation: Option<QualifiedName>,
    dependencies: DependencySet,
}

impl SchemaStatement {
    pub fn new(kind: ObjectKind, schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: StatementId(0),
            kind,
            schema: schema.into(),
            name: name.into(),
            parent: None,
            location: SourceSpan::synthetic(),
            columns: Vec::new(),
            arguments: Vec::new(),
            return_type: None,
            implementation: None,
            dependencies: DependencySet::new(),
        }
    }

    pub fn with_parent(mut self, parent: StatementId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_location(mut self, location: SourceSpan) -> Self {
        self.location = location;
        self
    }

    pub fn with_columns(mut self, columns: Vec<ColumnMetadata>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_arguments(mut self, arguments: Vec<FunctionParameter>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn with_implementation(mut self, function: QualifiedName) -> Self {
        self.implementation = Some(function);
        self
    }

    /// `schema.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Whether this statement is the object `schema.name` of the given kind
    pub fn is_named(&self, kind: ObjectKind, schema: &str, name: &str) -> bool {
        self.kind == kind
            && self.schema.eq_ignore_ascii_case(schema)
            && self.name.eq_ignore_ascii_case(name)
    }

    /// Record a dependency, ignoring references to the statement itself
    ///
    /// Returns `true` if the reference was new.
    pub fn add_dependency(&mut self, reference: ObjectReference) -> bool {
        if reference.column.is_none()
            && reference.points_to(self.kind, Some(&self.schema), &self.name)
        {
            debug!(statement = %self.qualified_name(), "Skipping self-dependency");
            return false;
        }
        self.dependencies.insert(reference)
    }

    pub fn dependencies(&self) -> &DependencySet {
        &self.dependencies
    }

    /// Replace the columns of a view with the ones inferred from its query
    ///
    /// Ignored for every other kind of statement.
    pub fn set_inferred_columns(&mut self, columns: Vec<ColumnMetadata>) {
        if self.kind == ObjectKind::View {
            self.columns = columns;
        } else {
            debug!(
                statement = %self.qualified_name(),
                kind = %self.kind,
                "Ignoring inferred columns for non-view statement"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    #[traced_test]
    fn test_self_dependency_is_skipped() {
        let mut function = SchemaStatement::new(ObjectKind::Function, "public", "fact");
        let itself = ObjectReference::new(
            ObjectKind::Function,
            Some("PUBLIC".to_string()),
            "fact",
            SourceSpan::new(40, 4, 3, 10),
        );
        assert!(!function.add_dependency(itself));
        assert!(function.dependencies().is_empty());
        assert!(logs_contain("Skipping self-dependency"));
    }

    #[test]
    fn test_column_of_own_table_is_kept() {
        let mut table = SchemaStatement::new(ObjectKind::Table, "public", "t");
        let own_column = ObjectReference::column(
            Some("public".to_string()),
            "t",
            "a",
            SourceSpan::new(1, 1, 1, 2),
        );
        let own_table = ObjectReference::new(
            ObjectKind::Table,
            Some("public".to_string()),
            "t",
            SourceSpan::new(1, 1, 1, 2),
        );
        assert!(table.add_dependency(own_column));
        assert!(!table.add_dependency(own_table));
        assert_eq!(table.dependencies().len(), 1);
    }

    #[test]
    fn test_inferred_columns_only_for_views() {
        let mut view = SchemaStatement::new(ObjectKind::View, "public", "v");
        view.set_inferred_columns(vec![ColumnMetadata::new("a", "int4")]);
        assert_eq!(view.columns.len(), 1);

        let mut table = SchemaStatement::new(ObjectKind::Table, "public", "t");
        table.set_inferred_columns(vec![ColumnMetadata::new("a", "int4")]);
        assert!(table.columns.is_empty());
    }
}
