// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Symbol types for semantic analysis
//!
//! This module defines the entries a [`Scope`](crate::Scope) holds for every
//! FROM item: relations from the metadata snapshot, CTE references, derived
//! tables and the pseudo relations (`NEW`, `OLD`, `EXCLUDED`) seeded for
//! trigger, rule and upsert bodies.

use schemadiff_catalog::{ColumnMetadata, RelationMetadata};
use schemadiff_ir::ObjectKind;
use serde::{Deserialize, Serialize};

/// The schema object a [`TableSymbol`] was resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSource {
    pub schema: String,
    pub name: String,
    pub kind: ObjectKind,
}

/// Represents a table symbol in a SQL query
///
/// A table symbol can be the actual table name or an alias (e.g., "u" in "FROM users u").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSymbol {
    /// The name the table was referenced by
    pub table_name: String,

    /// Schema qualifier written in the query, if any
    pub schema: Option<String>,

    /// Optional alias for the table (e.g., "u" for "FROM users u")
    pub alias: Option<String>,

    /// Columns available from this table
    pub columns: Vec<ColumnSymbol>,

    /// Catalog object behind the symbol; `None` for CTEs, derived tables and
    /// pseudo relations, whose columns never become dependencies
    pub source: Option<RelationSource>,
}

impl TableSymbol {
    /// Create a new table symbol
    ///
    /// # Examples
    ///
    /// ```
    /// use schemadiff_semantic::TableSymbol;
    ///
    /// let table = TableSymbol::new("users");
    /// assert_eq!(table.table_name, "users");
    /// assert!(table.source.is_none());
    /// ```
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            schema: None,
            alias: None,
            columns: Vec::new(),
            source: None,
        }
    }

    /// Build a symbol for a relation found in the metadata snapshot
    pub fn from_relation(relation: &RelationMetadata) -> Self {
        let columns = relation
            .columns
            .iter()
            .map(|c| ColumnSymbol::from_metadata(c, &relation.name))
            .collect();
        Self {
            table_name: relation.name.clone(),
            schema: Some(relation.schema.clone()),
            alias: None,
            columns,
            source: Some(RelationSource {
                schema: relation.schema.clone(),
                name: relation.name.clone(),
                kind: relation.kind.object_kind(),
            }),
        }
    }

    /// Set an alias for this table
    ///
    /// # Examples
    ///
    /// ```
    /// use schemadiff_semantic::TableSymbol;
    ///
    /// let table = TableSymbol::new("users").with_alias("u");
    /// assert_eq!(table.alias, Some("u".to_string()));
    /// ```
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the columns for this table
    pub fn with_columns(mut self, columns: Vec<ColumnSymbol>) -> Self {
        self.columns = columns;
        self
    }

    /// Check if this table matches the given name (by table_name or alias)
    ///
    /// # Examples
    ///
    /// ```
    /// use schemadiff_semantic::TableSymbol;
    ///
    /// let table = TableSymbol::new("users").with_alias("u");
    /// assert!(table.matches("users"));
    /// assert!(table.matches("U"));
    /// assert!(!table.matches("orders"));
    /// ```
    pub fn matches(&self, name: &str) -> bool {
        self.table_name.eq_ignore_ascii_case(name)
            || self
                .alias
                .as_deref()
                .is_some_and(|alias| alias.eq_ignore_ascii_case(name))
    }

    /// Whether an unaliased entry is the table `schema.name`
    ///
    /// The schema is compared only when both sides carry one.
    pub fn is_table(&self, schema: Option<&str>, name: &str) -> bool {
        if !self.table_name.eq_ignore_ascii_case(name) {
            return false;
        }
        match (schema, self.effective_schema()) {
            (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// Get the display name (alias if present, otherwise table_name)
    ///
    /// # Examples
    ///
    /// ```
    /// use schemadiff_semantic::TableSymbol;
    ///
    /// let table1 = TableSymbol::new("users");
    /// assert_eq!(table1.display_name(), "users");
    ///
    /// let table2 = TableSymbol::new("users").with_alias("u");
    /// assert_eq!(table2.display_name(), "u");
    /// ```
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table_name)
    }

    /// Find a column by name in this table
    pub fn find_column(&self, name: &str) -> Option<&ColumnSymbol> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn effective_schema(&self) -> Option<&str> {
        self.source
            .as_ref()
            .map(|s| s.schema.as_str())
            .or(self.schema.as_deref())
    }
}

/// Represents a column symbol in a SQL query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSymbol {
    /// Column name
    pub name: String,

    /// Declared or inferred type, if known
    pub data_type: Option<String>,

    /// Table this column belongs to
    pub table_name: String,
}

impl ColumnSymbol {
    /// Create a new column symbol
    ///
    /// # Examples
    ///
    /// ```
    /// use schemadiff_semantic::ColumnSymbol;
    ///
    /// let column = ColumnSymbol::new("id", Some("int4"), "users");
    /// assert_eq!(column.name, "id");
    /// assert_eq!(column.data_type.as_deref(), Some("int4"));
    /// ```
    pub fn new(
        name: impl Into<String>,
        data_type: Option<&str>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.map(str::to_string),
            table_name: table_name.into(),
        }
    }

    pub fn from_metadata(column: &ColumnMetadata, table_name: &str) -> Self {
        Self::new(&column.name, column.data_type.as_deref(), table_name)
    }

    /// Convert back to catalog metadata, e.g. for inferred view columns
    pub fn to_metadata(&self) -> ColumnMetadata {
        match &self.data_type {
            Some(data_type) => ColumnMetadata::new(&self.name, data_type),
            None => ColumnMetadata::untyped(&self.name),
        }
    }
}
