// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # schemadiff - Schema Model
//!
//! This crate holds the loaded schema: an arena of [`SchemaStatement`]s owned
//! by a [`Database`], the global reference index, and the snapshot builder
//! that turns the model into a read-only
//! [`MetadataSnapshot`](schemadiff_catalog::MetadataSnapshot).
//!
//! The model is completed in place by the analysis crate: dependencies are
//! attached with [`SchemaStatement::add_dependency`] and views receive their
//! inferred columns with [`SchemaStatement::set_inferred_columns`].

pub mod database;
pub mod error;
pub mod statement;

pub use database::Database;
pub use error::{SchemaError, SchemaResult};
pub use statement::{SchemaStatement, StatementId};
