// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata types for schema objects
//!
//! This module defines the read-only descriptions of relations, columns,
//! routines, operators and types that name resolution consults. Type names are
//! kept as the dialect spells them (`int4`, `varchar(20)`, `s.my_enum`): the
//! engine propagates types, it never interprets them.

use serde::{Deserialize, Serialize};

use crate::reference::ObjectKind;

/// Relation classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Table,
    View,
    MaterializedView,
    Sequence,
}

impl RelationKind {
    /// Object kind recorded when a query depends on this relation
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            RelationKind::Table => ObjectKind::Table,
            RelationKind::View | RelationKind::MaterializedView => ObjectKind::View,
            RelationKind::Sequence => ObjectKind::Sequence,
        }
    }

    pub fn is_view(&self) -> bool {
        matches!(self, RelationKind::View | RelationKind::MaterializedView)
    }
}

/// Metadata for a relation column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name
    pub name: String,
    /// Type name as written in the dialect, `None` when unknown
    pub data_type: Option<String>,
    /// Whether the column is nullable
    pub nullable: bool,
    /// Default value (as SQL expression string)
    pub default_value: Option<String>,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type.into()),
            nullable: true,
            default_value: None,
        }
    }

    /// A column whose type could not be inferred
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            nullable: true,
            default_value: None,
        }
    }

    /// Builder method: set nullable
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Builder method: set default value
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }
}

/// Metadata for a table, view or sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMetadata {
    /// Schema name
    pub schema: String,
    /// Relation name
    pub name: String,
    pub kind: RelationKind,
    /// Column definitions, in declaration order
    pub columns: Vec<ColumnMetadata>,
}

impl RelationMetadata {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind: RelationKind::Table,
            columns: Vec::new(),
        }
    }

    /// Builder method: add columns
    pub fn with_columns(mut self, columns: Vec<ColumnMetadata>) -> Self {
        self.columns = columns;
        self
    }

    /// Builder method: set relation kind
    pub fn with_kind(mut self, kind: RelationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Get column by name (case-insensitive)
    pub fn get_column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Routine classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    Function,
    Procedure,
    Aggregate,
}

impl FunctionKind {
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            FunctionKind::Function => ObjectKind::Function,
            FunctionKind::Procedure => ObjectKind::Procedure,
            FunctionKind::Aggregate => ObjectKind::Aggregate,
        }
    }
}

/// Function parameter definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionParameter {
    /// Parameter name, if declared with one
    pub name: Option<String>,
    /// Parameter type name
    pub data_type: String,
}

impl FunctionParameter {
    pub fn new(name: Option<&str>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.map(str::to_string),
            data_type: data_type.into(),
        }
    }
}

/// Metadata for a function, procedure or aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionMetadata {
    pub schema: String,
    pub name: String,
    pub kind: FunctionKind,
    pub parameters: Vec<FunctionParameter>,
    /// Declared return type, `None` for procedures and unresolved aggregates
    pub return_type: Option<String>,
}

impl FunctionMetadata {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind: FunctionKind::Function,
            parameters: Vec::new(),
            return_type: None,
        }
    }

    /// Builder method: add parameters
    pub fn with_parameters(mut self, params: Vec<FunctionParameter>) -> Self {
        self.parameters = params;
        self
    }

    /// Builder method: set return type
    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    /// Builder method: set routine kind
    pub fn with_kind(mut self, kind: FunctionKind) -> Self {
        self.kind = kind;
        self
    }

    /// Signature for logs and diagnostics, e.g. `s.f(int4, text) -> bool`
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self
            .parameters
            .iter()
            .map(|p| p.data_type.as_str())
            .collect();
        format!(
            "{}.{}({}) -> {}",
            self.schema,
            self.name,
            params.join(", "),
            self.return_type.as_deref().unwrap_or("void")
        )
    }
}

/// Metadata for a (possibly user-defined) operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorMetadata {
    pub schema: String,
    /// Operator symbol, e.g. `===`
    pub name: String,
    pub left_type: Option<String>,
    pub right_type: Option<String>,
    /// Return type copied from the implementing function
    pub return_type: Option<String>,
}

impl OperatorMetadata {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            left_type: None,
            right_type: None,
            return_type: None,
        }
    }

    pub fn with_operands(mut self, left: Option<&str>, right: Option<&str>) -> Self {
        self.left_type = left.map(str::to_string);
        self.right_type = right.map(str::to_string);
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }
}

/// Type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Base,
    Composite,
    Enum,
    Range,
    Domain,
}

/// Metadata for a user-defined type or domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMetadata {
    pub schema: String,
    pub name: String,
    pub kind: TypeKind,
}

impl TypeMetadata {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind,
        }
    }

    pub fn object_kind(&self) -> ObjectKind {
        match self.kind {
            TypeKind::Domain => ObjectKind::Domain,
            _ => ObjectKind::Type,
        }
    }

    /// Fully qualified type name
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_column_lookup_ignores_case() {
        let relation = RelationMetadata::new("public", "users")
            .with_columns(vec![ColumnMetadata::new("Id", "int4").with_nullable(false)]);
        let column = relation.get_column("id").unwrap();
        assert_eq!(column.data_type.as_deref(), Some("int4"));
        assert!(!column.nullable);
        assert!(relation.get_column("name").is_none());
    }

    #[test]
    fn test_relation_kind_maps_to_object_kind() {
        assert_eq!(RelationKind::MaterializedView.object_kind(), ObjectKind::View);
        assert_eq!(RelationKind::Sequence.object_kind(), ObjectKind::Sequence);
        assert!(RelationKind::View.is_view());
    }

    #[test]
    fn test_function_signature() {
        let function = FunctionMetadata::new("s", "f")
            .with_parameters(vec![
                FunctionParameter::new(Some("a"), "int4"),
                FunctionParameter::new(None, "text"),
            ])
            .with_return_type("bool");
        assert_eq!(function.signature(), "s.f(int4, text) -> bool");
    }

    #[test]
    fn test_domain_type_kind() {
        let domain = TypeMetadata::new("s", "email", TypeKind::Domain);
        assert_eq!(domain.object_kind(), ObjectKind::Domain);
        assert_eq!(domain.qualified_name(), "s.email");
    }
}
