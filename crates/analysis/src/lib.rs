// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # schemadiff - Dependency Analysis
//!
//! This crate turns the fragments queued while a schema was loaded into the
//! dependency graph of that schema.
//!
//! ## Core Concepts
//!
//! - [`AnalysisLauncher`]: one fragment, its owning statement and the scope it
//!   is walked in. Running it yields a [`LaunchOutcome`].
//! - [`LoadedDatabase`]: the database plus the arena of pending launchers.
//! - [`TaskManager`]: fixed-size worker pool; results are applied in
//!   submission order on the draining thread.
//! - [`FullAnalysis`]: the orchestrator. Operators and aggregates first, then
//!   views (on demand, each once), then everything else on the pool.
//!
//! ## Example
//!
//! ```rust
//! use schemadiff_analysis::{AnalysisConfig, FullAnalysis, LauncherKind, LoadedDatabase};
//! use schemadiff_catalog::ColumnMetadata;
//! use schemadiff_ir::{
//!     Dialect, Expr, ObjectKind, ParsedFragment, QualifiedName, Query, SelectItem,
//!     SelectStatement, TableRef,
//! };
//! use schemadiff_schema::{Database, SchemaStatement};
//!
//! let mut database = Database::new(Dialect::PostgreSQL);
//! database
//!     .add_statement(
//!         SchemaStatement::new(ObjectKind::Table, "public", "t")
//!             .with_columns(vec![ColumnMetadata::new("a", "int4")]),
//!     )
//!     .unwrap();
//! let v = database
//!     .add_statement(SchemaStatement::new(ObjectKind::View, "public", "v"))
//!     .unwrap();
//!
//! let query = Query::new(
//!     SelectStatement::new(vec![SelectItem::UnnamedExpr(Expr::column("a"))])
//!         .with_from(vec![TableRef::table(QualifiedName::new("t"))]),
//! );
//! let mut loaded = LoadedDatabase::new(database);
//! loaded
//!     .queue(v, LauncherKind::View, Some(ParsedFragment::query(Dialect::PostgreSQL, query)))
//!     .unwrap();
//!
//! let report = FullAnalysis::new(&mut loaded, AnalysisConfig::default()).run().unwrap();
//! assert!(report.is_clean());
//!
//! let view = loaded.database.statement(v).unwrap();
//! assert!(view.dependencies().depends_on(ObjectKind::Table, Some("public"), "t"));
//! assert_eq!(view.columns[0].data_type.as_deref(), Some("int4"));
//! ```

pub mod config;
pub mod error;
pub mod full_analysis;
pub mod launcher;
pub mod loaded;
pub mod report;
pub mod task_manager;

pub use config::{AnalysisConfig, ConfigError};
pub use error::{AnalysisError, AnalysisResult, TaskError};
pub use full_analysis::FullAnalysis;
pub use launcher::{AnalysisLauncher, LaunchOutcome, LauncherKind};
pub use loaded::LoadedDatabase;
pub use report::AnalysisReport;
pub use task_manager::{TaskHandle, TaskManager, TaskQueue};
