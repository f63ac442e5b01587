// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for the catalog crate

use std::sync::Arc;

use schemadiff_catalog::{
    CatalogError, ColumnMetadata, FunctionKind, FunctionMetadata, FunctionParameter,
    MetadataSnapshot, OperatorMetadata, RelationKind, RelationMetadata, StaticCatalog, TypeKind,
    TypeMetadata,
};

// Hand-written snapshot exercising the trait's default methods
struct TestCatalog;

impl MetadataSnapshot for TestCatalog {
    fn default_schema(&self) -> &str {
        "myapp"
    }

    fn find_relation(&self, schema: Option<&str>, name: &str) -> Option<RelationMetadata> {
        if schema.is_some_and(|s| s != "myapp") {
            return None;
        }
        match name {
            "users" => Some(RelationMetadata::new("myapp", "users").with_columns(vec![
                ColumnMetadata::new("id", "int8").with_nullable(false),
                ColumnMetadata::new("email", "varchar(255)").with_nullable(false),
            ])),
            _ => None,
        }
    }

    fn find_function(&self, _schema: Option<&str>, name: &str) -> Option<FunctionMetadata> {
        (name == "lower_email").then(|| {
            FunctionMetadata::new("myapp", "lower_email")
                .with_parameters(vec![FunctionParameter::new(Some("e"), "text")])
                .with_return_type("text")
        })
    }

    fn find_operator(&self, _schema: Option<&str>, _name: &str) -> Option<OperatorMetadata> {
        None
    }

    fn find_type(&self, _schema: Option<&str>, _name: &str) -> Option<TypeMetadata> {
        None
    }
}

fn shop_catalog() -> StaticCatalog {
    StaticCatalog::new("shop")
        .with_relation(
            RelationMetadata::new("shop", "orders").with_columns(vec![
                ColumnMetadata::new("id", "int8").with_nullable(false),
                ColumnMetadata::new("total", "numeric(12,2)").with_default("0"),
            ]),
        )
        .with_relation(
            RelationMetadata::new("shop", "order_id_seq").with_kind(RelationKind::Sequence),
        )
        .with_function(
            FunctionMetadata::new("shop", "sum_total")
                .with_kind(FunctionKind::Aggregate)
                .with_return_type("numeric"),
        )
        .with_operator(
            OperatorMetadata::new("shop", "===")
                .with_operands(Some("int8"), Some("int8"))
                .with_return_type("bool"),
        )
        .with_type(TypeMetadata::new("shop", "money_amount", TypeKind::Domain))
}

#[test]
fn test_default_get_columns() {
    let catalog = TestCatalog;
    let columns = catalog.get_columns(None, "users").unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[1].data_type.as_deref(), Some("varchar(255)"));
}

#[test]
fn test_default_get_columns_not_found() {
    let catalog = TestCatalog;
    let err = catalog.get_columns(Some("other"), "users").unwrap_err();
    assert_eq!(
        err,
        CatalogError::RelationNotFound("users".to_string(), "other".to_string())
    );
}

#[test]
fn test_error_display() {
    let err = CatalogError::RelationNotFound("test_table".to_string(), "public".to_string());
    let msg = format!("{}", err);
    assert!(msg.contains("test_table"));
    assert!(msg.contains("public"));
    assert!(msg.contains("not found"));
}

#[test]
fn test_shared_snapshot_through_arc() {
    let catalog: Arc<dyn MetadataSnapshot + Send + Sync> = Arc::new(shop_catalog());
    let handle = {
        let catalog = Arc::clone(&catalog);
        std::thread::spawn(move || catalog.find_operator(None, "===").map(|o| o.return_type))
    };
    assert_eq!(handle.join().unwrap(), Some(Some("bool".to_string())));
    assert_eq!(catalog.default_schema(), "shop");
}

#[test]
fn test_complete_metadata_workflow() {
    let catalog = shop_catalog();

    let orders = catalog.find_relation(None, "orders").unwrap();
    assert_eq!(orders.kind.object_kind(), schemadiff_ir::ObjectKind::Table);
    assert_eq!(
        orders.get_column("TOTAL").and_then(|c| c.default_value.as_deref()),
        Some("0")
    );

    let sequence = catalog.find_relation(Some("shop"), "order_id_seq").unwrap();
    assert_eq!(sequence.kind, RelationKind::Sequence);

    let aggregate = catalog.find_function(None, "sum_total").unwrap();
    assert_eq!(aggregate.kind.object_kind(), schemadiff_ir::ObjectKind::Aggregate);

    let domain = catalog.find_type(Some("SHOP"), "money_amount").unwrap();
    assert_eq!(domain.object_kind(), schemadiff_ir::ObjectKind::Domain);
}

#[test]
fn test_json_serialization_roundtrip() {
    let relation = RelationMetadata::new("shop", "orders")
        .with_columns(vec![ColumnMetadata::untyped("payload")]);

    let json = serde_json::to_string(&relation).unwrap();
    let deserialized: RelationMetadata = serde_json::from_str(&json).unwrap();

    assert_eq!(relation, deserialized);
}
