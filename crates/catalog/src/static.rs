// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Static Catalog
//!
//! This module provides the in-memory [`MetadataSnapshot`] built from the
//! statements of a loaded database, or from a JSON schema definition in tests.
//!
//! ## Usage
//!
//! ```rust
//! use schemadiff_catalog::{ColumnMetadata, MetadataSnapshot, RelationMetadata, StaticCatalog};
//!
//! let catalog = StaticCatalog::new("public").with_relation(
//!     RelationMetadata::new("public", "t").with_columns(vec![ColumnMetadata::new("a", "int4")]),
//! );
//! let columns = catalog.get_columns(None, "T").unwrap();
//! assert_eq!(columns[0].name, "a");
//! ```

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::metadata::{
    ColumnMetadata, FunctionMetadata, OperatorMetadata, RelationMetadata, TypeMetadata,
};
use crate::{CatalogError, CatalogResult, MetadataSnapshot};

type Key = (String, String);

fn key(schema: &str, name: &str) -> Key {
    (schema.to_lowercase(), name.to_lowercase())
}

/// Snapshot with all objects held in hash indexes
///
/// Keys are lower-cased schema + name pairs. Unqualified lookups try each
/// schema of the search path in order.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    search_path: Vec<String>,
    relations: HashMap<Key, RelationMetadata>,
    functions: HashMap<Key, Vec<FunctionMetadata>>,
    operators: HashMap<Key, Vec<OperatorMetadata>>,
    types: HashMap<Key, TypeMetadata>,
}

/// JSON shape accepted by [`StaticCatalog::from_json`]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDefinition {
    default_schema: String,
    #[serde(default)]
    search_path: Vec<String>,
    #[serde(default)]
    relations: Vec<RelationMetadata>,
    #[serde(default)]
    functions: Vec<FunctionMetadata>,
    #[serde(default)]
    operators: Vec<OperatorMetadata>,
    #[serde(default)]
    types: Vec<TypeMetadata>,
}

impl StaticCatalog {
    /// Create an empty catalog whose search path is just `default_schema`
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            search_path: vec![default_schema.into()],
            ..Self::default()
        }
    }

    /// Load a catalog from its JSON definition
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let definition: CatalogDefinition = serde_json::from_str(json)?;
        if definition.default_schema.trim().is_empty() {
            return Err(CatalogError::InvalidSchema(definition.default_schema));
        }

        let mut catalog = Self::new(definition.default_schema)
            .with_search_path(definition.search_path);
        for relation in definition.relations {
            catalog.add_relation(relation);
        }
        for function in definition.functions {
            catalog.add_function(function);
        }
        for operator in definition.operators {
            catalog.add_operator(operator);
        }
        for ty in definition.types {
            catalog.add_type(ty);
        }
        Ok(catalog)
    }

    /// Append schemas searched after the default schema
    pub fn with_search_path(mut self, schemas: impl IntoIterator<Item = String>) -> Self {
        for schema in schemas {
            if !self
                .search_path
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&schema))
            {
                self.search_path.push(schema);
            }
        }
        self
    }

    /// Builder method: add a relation
    pub fn with_relation(mut self, relation: RelationMetadata) -> Self {
        self.add_relation(relation);
        self
    }

    /// Builder method: add a routine
    pub fn with_function(mut self, function: FunctionMetadata) -> Self {
        self.add_function(function);
        self
    }

    /// Builder method: add an operator
    pub fn with_operator(mut self, operator: OperatorMetadata) -> Self {
        self.add_operator(operator);
        self
    }

    /// Builder method: add a type
    pub fn with_type(mut self, ty: TypeMetadata) -> Self {
        self.add_type(ty);
        self
    }

    /// Insert or replace a relation
    pub fn add_relation(&mut self, relation: RelationMetadata) {
        let k = key(&relation.schema, &relation.name);
        if self.relations.insert(k, relation).is_some() {
            debug!("Replaced relation metadata in static catalog");
        }
    }

    /// Add a routine; overloads accumulate in declaration order
    pub fn add_function(&mut self, function: FunctionMetadata) {
        self.functions
            .entry(key(&function.schema, &function.name))
            .or_default()
            .push(function);
    }

    /// Add an operator; overloads on other operand types accumulate
    pub fn add_operator(&mut self, operator: OperatorMetadata) {
        self.operators
            .entry(key(&operator.schema, &operator.name))
            .or_default()
            .push(operator);
    }

    pub fn add_type(&mut self, ty: TypeMetadata) {
        self.types.insert(key(&ty.schema, &ty.name), ty);
    }

    /// Replace the columns of a relation, returning `false` if it is unknown
    pub fn set_columns(
        &mut self,
        schema: &str,
        name: &str,
        columns: Vec<ColumnMetadata>,
    ) -> bool {
        match self.relations.get_mut(&key(schema, name)) {
            Some(relation) => {
                relation.columns = columns;
                true
            }
            None => false,
        }
    }

    /// All routine overloads registered under a name
    pub fn function_overloads(&self, schema: &str, name: &str) -> &[FunctionMetadata] {
        self.functions
            .get(&key(schema, name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All operator overloads registered under a symbol
    pub fn operator_overloads(&self, schema: &str, name: &str) -> &[OperatorMetadata] {
        self.operators
            .get(&key(schema, name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of relations in the catalog
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn search_path(&self) -> &[String] {
        &self.search_path
    }

    fn lookup<'a, T>(
        &'a self,
        index: &'a HashMap<Key, T>,
        schema: Option<&str>,
        name: &str,
    ) -> Option<&'a T> {
        match schema {
            Some(schema) => index.get(&key(schema, name)),
            None => self
                .search_path
                .iter()
                .find_map(|schema| index.get(&key(schema, name))),
        }
    }
}

impl MetadataSnapshot for StaticCatalog {
    fn default_schema(&self) -> &str {
        self.search_path.first().map(String::as_str).unwrap_or("")
    }

    fn find_relation(&self, schema: Option<&str>, name: &str) -> Option<RelationMetadata> {
        self.lookup(&self.relations, schema, name).cloned()
    }

    fn find_function(&self, schema: Option<&str>, name: &str) -> Option<FunctionMetadata> {
        self.lookup(&self.functions, schema, name)
            .and_then(|overloads| overloads.first())
            .cloned()
    }

    fn find_operator(&self, schema: Option<&str>, name: &str) -> Option<OperatorMetadata> {
        self.lookup(&self.operators, schema, name)
            .and_then(|overloads| overloads.first())
            .cloned()
    }

    fn find_type(&self, schema: Option<&str>, name: &str) -> Option<TypeMetadata> {
        self.lookup(&self.types, schema, name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FunctionKind, RelationKind, TypeKind};
    use tracing_test::traced_test;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new("public")
            .with_search_path(vec!["app".to_string()])
            .with_relation(
                RelationMetadata::new("public", "users").with_columns(vec![
                    ColumnMetadata::new("id", "int8"),
                    ColumnMetadata::new("email", "text"),
                ]),
            )
            .with_relation(RelationMetadata::new("app", "orders"))
            .with_relation(
                RelationMetadata::new("app", "order_totals").with_kind(RelationKind::View),
            )
            .with_function(
                FunctionMetadata::new("app", "total").with_return_type("numeric"),
            )
            .with_function(
                FunctionMetadata::new("app", "total")
                    .with_kind(FunctionKind::Aggregate)
                    .with_return_type("int8"),
            )
            .with_type(TypeMetadata::new("app", "status", TypeKind::Enum))
    }

    #[test]
    fn test_unqualified_lookup_walks_search_path() {
        let catalog = catalog();
        assert_eq!(catalog.find_relation(None, "users").unwrap().schema, "public");
        assert_eq!(catalog.find_relation(None, "ORDERS").unwrap().schema, "app");
        assert!(catalog.find_relation(Some("public"), "orders").is_none());
    }

    #[test]
    fn test_overloads_return_first_declared() {
        let catalog = catalog();
        let function = catalog.find_function(Some("app"), "total").unwrap();
        assert_eq!(function.kind, FunctionKind::Function);
        assert_eq!(catalog.function_overloads("APP", "Total").len(), 2);
    }

    #[test]
    fn test_operator_overloads_are_kept() {
        let catalog = catalog()
            .with_operator(
                OperatorMetadata::new("app", "===")
                    .with_operands(Some("int4"), Some("int4"))
                    .with_return_type("boolean"),
            )
            .with_operator(
                OperatorMetadata::new("app", "===")
                    .with_operands(Some("text"), Some("text"))
                    .with_return_type("int4"),
            );

        let operator = catalog.find_operator(None, "===").unwrap();
        assert_eq!(operator.left_type.as_deref(), Some("int4"));
        assert_eq!(operator.return_type.as_deref(), Some("boolean"));

        let overloads = catalog.operator_overloads("App", "===");
        assert_eq!(overloads.len(), 2);
        assert_eq!(overloads[1].right_type.as_deref(), Some("text"));
        assert!(catalog.operator_overloads("public", "===").is_empty());
    }

    #[test]
    fn test_get_columns_not_found() {
        let catalog = catalog();
        let result = catalog.get_columns(None, "nonexistent");
        assert_eq!(
            result,
            Err(CatalogError::RelationNotFound(
                "nonexistent".to_string(),
                "public".to_string()
            ))
        );
    }

    #[test]
    #[traced_test]
    fn test_replacing_relation_is_logged() {
        let mut catalog = catalog();
        catalog.add_relation(RelationMetadata::new("PUBLIC", "Users"));
        assert_eq!(catalog.relation_count(), 3);
        assert!(catalog.find_relation(None, "users").unwrap().columns.is_empty());
        assert!(logs_contain("Replaced relation metadata"));
    }

    #[test]
    fn test_set_columns() {
        let mut catalog = catalog();
        assert!(catalog.set_columns("app", "order_totals", vec![ColumnMetadata::untyped("n")]));
        assert!(!catalog.set_columns("app", "missing", Vec::new()));
        let columns = catalog.get_columns(Some("app"), "order_totals").unwrap();
        assert_eq!(columns.len(), 1);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "defaultSchema": "public",
            "relations": [
                {"schema": "public", "name": "t", "kind": "Table",
                 "columns": [{"name": "a", "data_type": "int4", "nullable": true, "default_value": null}]}
            ],
            "types": [{"schema": "public", "name": "mood", "kind": "Enum"}]
        }"#;
        let catalog = StaticCatalog::from_json(json).unwrap();
        assert_eq!(catalog.relation_count(), 1);
        assert!(catalog.find_type(None, "mood").is_some());
    }

    #[test]
    fn test_from_json_rejects_empty_schema() {
        let result = StaticCatalog::from_json(r#"{"defaultSchema": " "}"#);
        assert!(matches!(result, Err(CatalogError::InvalidSchema(_))));

        let result = StaticCatalog::from_json("not json");
        assert!(matches!(result, Err(CatalogError::SerializationError(_))));
    }
}
