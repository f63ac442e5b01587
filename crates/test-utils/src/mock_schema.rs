// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Mock schema model for testing
//!
//! Provides a [`Database`] with builder pattern for easy test setup. Every
//! statement is remembered under the name it was added with so tests can look
//! up its [`StatementId`] later.

use std::collections::HashMap;

use schemadiff_catalog::ColumnMetadata;
use schemadiff_ir::{Dialect, FunctionParameter, ObjectKind};
use schemadiff_schema::{Database, SchemaStatement, StatementId};

/// A database plus the ids of the statements a test added
#[derive(Debug, Clone)]
pub struct MockSchema {
    pub database: Database,
    ids: HashMap<String, StatementId>,
}

impl MockSchema {
    /// Id of a statement by the name it was added with
    ///
    /// # Panics
    ///
    /// If no statement was added under `name`.
    pub fn id(&self, name: &str) -> StatementId {
        match self.ids.get(name) {
            Some(id) => *id,
            None => panic!("No statement named '{}' in mock schema", name),
        }
    }

    pub fn statement(&self, name: &str) -> &SchemaStatement {
        match self.database.statement(self.id(name)) {
            Some(statement) => statement,
            None => panic!("Statement '{}' vanished from mock schema", name),
        }
    }
}

/// Builder for creating mock schemas with a fluent API
pub struct MockSchemaBuilder {
    database: Database,
    ids: HashMap<String, StatementId>,
}

impl Default for MockSchemaBuilder {
    fn default() -> Self {
        Self::new(Dialect::PostgreSQL)
    }
}

impl MockSchemaBuilder {
    /// Create a new builder
    pub fn new(dialect: Dialect) -> Self {
        Self {
            database: Database::new(dialect),
            ids: HashMap::new(),
        }
    }

    /// `t(a int4)`, `v` and `v2`, the view-of-view example
    pub fn with_standard_schema(self) -> Self {
        self.table("t", &[("a", "int4")]).view("v").view("v2")
    }

    /// Add a table; `name` may be schema-qualified
    pub fn table(self, name: &str, columns: &[(&str, &str)]) -> Self {
        let columns = columns
            .iter()
            .map(|(column, data_type)| ColumnMetadata::new(*column, *data_type))
            .collect();
        self.add(name, ObjectKind::Table, |s| s.with_columns(columns))
    }

    /// Add a view whose columns analysis will infer
    pub fn view(self, name: &str) -> Self {
        self.add(name, ObjectKind::View, |s| s)
    }

    pub fn sequence(self, name: &str) -> Self {
        self.add(name, ObjectKind::Sequence, |s| s)
    }

    /// Add a function with positional argument types
    pub fn function(self, name: &str, arguments: &[&str], return_type: &str) -> Self {
        let arguments = parameters(arguments);
        self.add(name, ObjectKind::Function, |s| {
            s.with_arguments(arguments).with_return_type(return_type)
        })
    }

    pub fn procedure(self, name: &str, arguments: &[&str]) -> Self {
        let arguments = parameters(arguments);
        self.add(name, ObjectKind::Procedure, |s| s.with_arguments(arguments))
    }

    /// Add an aggregate implemented by `implementation`
    pub fn aggregate(self, name: &str, arguments: &[&str], implementation: &str) -> Self {
        let arguments = parameters(arguments);
        let implementation = qualified(implementation);
        self.add(name, ObjectKind::Aggregate, |s| {
            s.with_arguments(arguments).with_implementation(implementation)
        })
    }

    /// Add a binary operator implemented by `implementation`
    pub fn operator(self, name: &str, left: &str, right: &str, implementation: &str) -> Self {
        let arguments = parameters(&[left, right]);
        let implementation = qualified(implementation);
        self.add(name, ObjectKind::Operator, |s| {
            s.with_arguments(arguments).with_implementation(implementation)
        })
    }

    /// Add a constraint, index, trigger or rule on an existing table
    ///
    /// The child is remembered as `table.name`.
    pub fn child(mut self, table: &str, kind: ObjectKind, name: &str) -> Self {
        let parent = self.existing(table);
        let schema = match self.database.statement(parent) {
            Some(statement) => statement.schema.clone(),
            None => panic!("Parent '{}' vanished from mock schema", table),
        };
        let statement = SchemaStatement::new(kind, schema, name).with_parent(parent);
        let id = match self.database.add_statement(statement) {
            Ok(id) => id,
            Err(err) => panic!("Failed to add {} '{}': {}", kind, name, err),
        };
        self.ids.insert(format!("{}.{}", table, name), id);
        self
    }

    pub fn build(self) -> MockSchema {
        MockSchema {
            database: self.database,
            ids: self.ids,
        }
    }

    fn add(
        mut self,
        name: &str,
        kind: ObjectKind,
        configure: impl FnOnce(SchemaStatement) -> SchemaStatement,
    ) -> Self {
        let (schema, object) = match name.split_once('.') {
            Some((schema, object)) => (schema.to_string(), object.to_string()),
            None => (self.database.default_schema.clone(), name.to_string()),
        };
        let statement = configure(SchemaStatement::new(kind, schema, object));
        let id = match self.database.add_statement(statement) {
            Ok(id) => id,
            Err(err) => panic!("Failed to add {} '{}': {}", kind, name, err),
        };
        self.ids.insert(name.to_string(), id);
        self
    }

    fn existing(&self, name: &str) -> StatementId {
        match self.ids.get(name) {
            Some(id) => *id,
            None => panic!("No statement named '{}' in mock schema", name),
        }
    }
}

fn parameters(types: &[&str]) -> Vec<FunctionParameter> {
    types
        .iter()
        .map(|data_type| FunctionParameter::new(None, *data_type))
        .collect()
}

fn qualified(name: &str) -> schemadiff_ir::QualifiedName {
    crate::fixtures::IrFixtures::name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_schema() {
        let schema = MockSchemaBuilder::default().with_standard_schema().build();
        assert_eq!(schema.database.len(), 3);
        assert_eq!(schema.statement("t").columns[0].name, "a");
        assert_eq!(schema.statement("v2").kind, ObjectKind::View);
    }

    #[test]
    fn test_child_is_named_after_table() {
        let schema = MockSchemaBuilder::default()
            .table("app.orders", &[("id", "int8")])
            .child("app.orders", ObjectKind::Constraint, "orders_id_check")
            .build();
        let check = schema.statement("app.orders.orders_id_check");
        assert_eq!(check.schema, "app");
        assert_eq!(check.parent, Some(schema.id("app.orders")));
    }
}
