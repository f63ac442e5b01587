// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for the schema model

use schemadiff_catalog::{ColumnMetadata, MetadataSnapshot};
use schemadiff_ir::{Dialect, ObjectKind, ObjectReference, QualifiedName, SourceSpan};
use schemadiff_schema::{Database, SchemaStatement};

#[test]
fn test_default_schema_per_dialect() {
    assert_eq!(Database::new(Dialect::Greenplum).default_schema, "public");
    assert_eq!(Database::new(Dialect::ClickHouse).default_schema, "default");
    assert_eq!(Database::new(Dialect::MsSql).default_schema, "dbo");
    assert_eq!(
        Database::new(Dialect::PostgreSQL)
            .with_default_schema("app")
            .default_schema,
        "app"
    );
}

#[test]
fn test_inferred_view_columns_reach_snapshot() {
    let mut db = Database::new(Dialect::PostgreSQL);
    db.add_statement(
        SchemaStatement::new(ObjectKind::Table, "public", "t")
            .with_columns(vec![ColumnMetadata::new("a", "int4")]),
    )
    .unwrap();
    let v = db
        .add_statement(SchemaStatement::new(ObjectKind::View, "public", "v"))
        .unwrap();

    assert!(db.snapshot().get_columns(None, "v").unwrap().is_empty());

    let view = db.statement_mut(v).unwrap();
    view.set_inferred_columns(vec![ColumnMetadata::new("a", "int4")]);
    view.add_dependency(ObjectReference::new(
        ObjectKind::Table,
        Some("public".to_string()),
        "t",
        SourceSpan::new(30, 1, 1, 31),
    ));

    let columns = db.snapshot().get_columns(None, "v").unwrap();
    assert_eq!(columns[0].data_type.as_deref(), Some("int4"));
    assert!(db
        .statement(v)
        .unwrap()
        .dependencies()
        .depends_on(ObjectKind::Table, Some("public"), "t"));
}

#[test]
fn test_routines_may_be_overloaded() {
    let mut db = Database::new(Dialect::PostgreSQL);
    db.add_statement(SchemaStatement::new(ObjectKind::Function, "public", "f").with_return_type("int4"))
        .unwrap();
    db.add_statement(SchemaStatement::new(ObjectKind::Function, "public", "f").with_return_type("text"))
        .unwrap();
    db.add_statement(
        SchemaStatement::new(ObjectKind::Aggregate, "public", "agg")
            .with_implementation(QualifiedName::new("f").with_schema("public")),
    )
    .unwrap();
    assert_eq!(db.len(), 3);

    let snapshot = db.snapshot();
    assert_eq!(snapshot.function_overloads("public", "f").len(), 2);
    assert_eq!(
        snapshot.find_function(None, "f").and_then(|f| f.return_type),
        Some("int4".to_string())
    );
}

#[test]
fn test_database_serializes() {
    let mut db = Database::new(Dialect::ClickHouse);
    db.add_statement(SchemaStatement::new(ObjectKind::Table, "default", "events"))
        .unwrap();
    let json = serde_json::to_string(&db).unwrap();
    let back: Database = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back.dialect, Dialect::ClickHouse);
}
