// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for schemadiff
//!
//! This crate provides:
//! - IR builders for writing parsed fragments by hand
//! - A schema builder producing a [`Database`](schemadiff_schema::Database)
//! - Assertions over dependency sets

pub mod assertions;
pub mod fixtures;
pub mod mock_schema;

pub use assertions::DependencyAssertions;
pub use fixtures::IrFixtures;
pub use mock_schema::MockSchemaBuilder;
