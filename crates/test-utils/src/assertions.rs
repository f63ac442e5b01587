// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Dependency-specific test helpers and custom assertions

use schemadiff_ir::{DependencySet, ObjectKind};
use schemadiff_schema::SchemaStatement;

/// Custom assertion helpers for dependency testing
pub struct DependencyAssertions;

impl DependencyAssertions {
    /// Assert that a statement depends on `schema.name` of the given kind
    pub fn assert_depends_on(statement: &SchemaStatement, kind: ObjectKind, schema: &str, name: &str) {
        assert!(
            statement.dependencies().depends_on(kind, Some(schema), name),
            "Expected {} to depend on {} {}.{}, found {:?}",
            statement.qualified_name(),
            kind,
            schema,
            name,
            Self::describe(statement.dependencies())
        );
    }

    /// Assert that a statement does not depend on `schema.name` of the given kind
    pub fn assert_not_depends_on(
        statement: &SchemaStatement,
        kind: ObjectKind,
        schema: &str,
        name: &str,
    ) {
        assert!(
            !statement.dependencies().depends_on(kind, Some(schema), name),
            "Expected {} not to depend on {} {}.{}",
            statement.qualified_name(),
            kind,
            schema,
            name
        );
    }

    /// Assert that a statement depends on column `schema.table.column`
    pub fn assert_column_dependency(
        statement: &SchemaStatement,
        schema: &str,
        table: &str,
        column: &str,
    ) {
        let found = statement.dependencies().iter().any(|r| {
            r.kind == ObjectKind::Column
                && r.schema.as_deref() == Some(schema)
                && r.name.eq_ignore_ascii_case(table)
                && r.column
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(column))
        });
        assert!(
            found,
            "Expected {} to depend on column {}.{}.{}, found {:?}",
            statement.qualified_name(),
            schema,
            table,
            column,
            Self::describe(statement.dependencies())
        );
    }

    /// Render a dependency set for failure messages
    pub fn describe(dependencies: &DependencySet) -> Vec<String> {
        dependencies.iter().map(ToString::to_string).collect()
    }
}
