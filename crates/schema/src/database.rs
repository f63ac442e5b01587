// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Database model
//!
//! The [`Database`] owns every [`SchemaStatement`] of one loaded schema in an
//! arena indexed by [`StatementId`]. It is deliberately not shared between
//! threads: analysis reads a [`StaticCatalog`] snapshot taken from it and all
//! mutation happens on the thread that drains analysis results.

use serde::{Deserialize, Serialize};
use tracing::debug;

use schemadiff_catalog::{
    FunctionKind, FunctionMetadata, OperatorMetadata, RelationKind, RelationMetadata,
    StaticCatalog, TypeKind, TypeMetadata,
};
use schemadiff_ir::{DependencySet, Dialect, DialectFamily, ObjectKind};

use crate::error::{SchemaError, SchemaResult};
use crate::statement::{SchemaStatement, StatementId};

/// The complete schema model of one source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub dialect: Dialect,
    /// Schema assumed for unqualified names
    pub default_schema: String,
    statements: Vec<SchemaStatement>,
    /// Every reference found by analysis, including system objects
    references: DependencySet,
}

impl Database {
    /// Create an empty database using the dialect's conventional default schema
    pub fn new(dialect: Dialect) -> Self {
        let default_schema = match dialect.family() {
            DialectFamily::PostgreSQL => "public",
            DialectFamily::ClickHouse => "default",
            DialectFamily::MsSql => "dbo",
        };
        Self {
            dialect,
            default_schema: default_schema.to_string(),
            statements: Vec::new(),
            references: DependencySet::new(),
        }
    }

    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    /// Add a statement, assigning its id
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnknownParent` if the parent id is not in this
    /// database, and `SchemaError::Duplicate` if a non-routine object with the
    /// same kind, schema, name and parent already exists. Routines may be
    /// overloaded.
    pub fn add_statement(&mut self, mut statement: SchemaStatement) -> SchemaResult<StatementId> {
        if let Some(parent) = statement.parent {
            if parent.0 >= self.statements.len() {
                return Err(SchemaError::UnknownParent(parent));
            }
        }

        let overloadable = statement.kind.is_routine() || statement.kind == ObjectKind::Operator;
        if !overloadable
            && self.statements.iter().any(|s| {
                s.parent == statement.parent
                    && s.is_named(statement.kind, &statement.schema, &statement.name)
            })
        {
            return Err(SchemaError::Duplicate {
                kind: statement.kind,
                schema: statement.schema,
                name: statement.name,
            });
        }

        let id = StatementId(self.statements.len());
        statement.id = id;
        debug!(statement = %statement.qualified_name(), kind = %statement.kind, %id, "Added statement");
        self.statements.push(statement);
        Ok(id)
    }

    pub fn statement(&self, id: StatementId) -> Option<&SchemaStatement> {
        self.statements.get(id.0)
    }

    pub fn statement_mut(&mut self, id: StatementId) -> Option<&mut SchemaStatement> {
        self.statements.get_mut(id.0)
    }

    pub fn statements(&self) -> impl Iterator<Item = &SchemaStatement> {
        self.statements.iter()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Find a top-level object; `None` schema means the default schema
    pub fn find(&self, kind: ObjectKind, schema: Option<&str>, name: &str) -> Option<StatementId> {
        let schema = schema.unwrap_or(&self.default_schema);
        self.statements
            .iter()
            .find(|s| s.parent.is_none() && s.is_named(kind, schema, name))
            .map(|s| s.id)
    }

    /// Statements contained in `parent`, in insertion order
    pub fn children(&self, parent: StatementId) -> impl Iterator<Item = &SchemaStatement> {
        self.statements
            .iter()
            .filter(move |s| s.parent == Some(parent))
    }

    /// Global reference index, in discovery order
    pub fn references(&self) -> &DependencySet {
        &self.references
    }

    /// Append references to the global index, skipping ones already present
    pub fn merge_references(&mut self, references: DependencySet) {
        self.references.extend(references);
    }

    /// Build a read-only metadata snapshot of the current model
    ///
    /// Views contribute whatever columns they have at the time of the call:
    /// none before analysis, the inferred ones afterwards.
    pub fn snapshot(&self) -> StaticCatalog {
        let mut catalog = StaticCatalog::new(self.default_schema.clone());
        for statement in self.statements.iter().filter(|s| s.parent.is_none()) {
            match statement.kind {
                ObjectKind::Table | ObjectKind::View | ObjectKind::Sequence => {
                    let kind = match statement.kind {
                        ObjectKind::View => RelationKind::View,
                        ObjectKind::Sequence => RelationKind::Sequence,
                        _ => RelationKind::Table,
                    };
                    catalog.add_relation(
                        RelationMetadata::new(&statement.schema, &statement.name)
                            .with_kind(kind)
                            .with_columns(statement.columns.clone()),
                    );
                }
                ObjectKind::Function | ObjectKind::Procedure | ObjectKind::Aggregate => {
                    let kind = match statement.kind {
                        ObjectKind::Procedure => FunctionKind::Procedure,
                        ObjectKind::Aggregate => FunctionKind::Aggregate,
                        _ => FunctionKind::Function,
                    };
                    let mut function = FunctionMetadata::new(&statement.schema, &statement.name)
                        .with_kind(kind)
                        .with_parameters(statement.arguments.clone());
                    function.return_type = statement.return_type.clone();
                    catalog.add_function(function);
                }
                ObjectKind::Operator => {
                    let left = statement.arguments.first().map(|a| a.data_type.as_str());
                    let right = statement.arguments.get(1).map(|a| a.data_type.as_str());
                    let mut operator = OperatorMetadata::new(&statement.schema, &statement.name)
                        .with_operands(left, right);
                    operator.return_type = statement.return_type.clone();
                    catalog.add_operator(operator);
                }
                ObjectKind::Type => catalog.add_type(TypeMetadata::new(
                    &statement.schema,
                    &statement.name,
                    TypeKind::Base,
                )),
                ObjectKind::Domain => catalog.add_type(TypeMetadata::new(
                    &statement.schema,
                    &statement.name,
                    TypeKind::Domain,
                )),
                _ => {}
            }
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemadiff_catalog::{ColumnMetadata, MetadataSnapshot};
    use schemadiff_ir::{FunctionParameter, ObjectReference, SourceSpan};

    fn database() -> Database {
        let mut db = Database::new(Dialect::PostgreSQL);
        let t = db
            .add_statement(
                SchemaStatement::new(ObjectKind::Table, "public", "t")
                    .with_columns(vec![ColumnMetadata::new("a", "int4")]),
            )
            .unwrap();
        db.add_statement(SchemaStatement::new(ObjectKind::Constraint, "public", "t_a_check").with_parent(t))
            .unwrap();
        db.add_statement(SchemaStatement::new(ObjectKind::View, "public", "v"))
            .unwrap();
        db.add_statement(
            SchemaStatement::new(ObjectKind::Operator, "public", "===")
                .with_arguments(vec![
                    FunctionParameter::new(None, "int4"),
                    FunctionParameter::new(None, "int4"),
                ])
                .with_return_type("bool"),
        )
        .unwrap();
        db
    }

    #[test]
    fn test_find_uses_default_schema() {
        let db = database();
        assert_eq!(db.find(ObjectKind::Table, None, "T"), Some(StatementId(0)));
        assert_eq!(db.find(ObjectKind::Table, Some("other"), "t"), None);
        // Children are not top-level objects
        assert_eq!(db.find(ObjectKind::Constraint, None, "t_a_check"), None);
        assert_eq!(db.children(StatementId(0)).count(), 1);
    }

    #[test]
    fn test_duplicate_and_unknown_parent() {
        let mut db = database();
        let duplicate = db.add_statement(SchemaStatement::new(ObjectKind::Table, "PUBLIC", "t"));
        assert!(matches!(duplicate, Err(SchemaError::Duplicate { .. })));

        let orphan = db.add_statement(
            SchemaStatement::new(ObjectKind::Index, "public", "i").with_parent(StatementId(42)),
        );
        assert_eq!(orphan, Err(SchemaError::UnknownParent(StatementId(42))));
    }

    #[test]
    fn test_snapshot_reflects_statements() {
        let db = database();
        let snapshot = db.snapshot();
        assert_eq!(snapshot.get_columns(None, "t").unwrap().len(), 1);
        assert_eq!(
            snapshot.find_relation(None, "v").map(|r| r.kind),
            Some(RelationKind::View)
        );
        let operator = snapshot.find_operator(Some("public"), "===").unwrap();
        assert_eq!(operator.left_type.as_deref(), Some("int4"));
        assert_eq!(operator.return_type.as_deref(), Some("bool"));
    }

    #[test]
    fn test_merge_references_keeps_order() {
        let mut db = database();
        let first = ObjectReference::new(
            ObjectKind::Table,
            Some("public".to_string()),
            "t",
            SourceSpan::new(0, 1, 1, 1),
        );
        let second = ObjectReference::new(
            ObjectKind::Function,
            Some("pg_catalog".to_string()),
            "now",
            SourceSpan::new(5, 3, 1, 6),
        );
        db.merge_references(vec![first.clone(), second.clone()].into());
        db.merge_references(vec![first.clone()].into());
        let merged: Vec<_> = db.references().iter().cloned().collect();
        assert_eq!(merged, vec![first, second]);
    }
}
