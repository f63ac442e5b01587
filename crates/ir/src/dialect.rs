// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Dialect Support
//!
//! This module defines the SQL dialects whose parsed fragments the engine can
//! analyse.
//!
//! ## Dialect Families
//!
//! - **PostgreSQL Family**: PostgreSQL and Greenplum
//!   - Lower-cased unquoted identifiers, `pg_catalog` system schema,
//!     `nextval('seq')` sequence references, `::regclass` casts
//! - **ClickHouse**: case-sensitive identifiers, `system` schema,
//!   `COLUMNS('regex')` dynamic projections
//! - **SQL Server**: case-insensitive identifiers, `sys` schema, bracket quoting
//!
//! Every parsed fragment carries the dialect it was produced by; a launcher that
//! receives a fragment from a different family reports a structural error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL (11+)
    PostgreSQL,
    /// Greenplum (6, 7)
    Greenplum,
    /// ClickHouse
    ClickHouse,
    /// Microsoft SQL Server
    MsSql,
}

impl Dialect {
    /// Returns the family this dialect belongs to
    pub fn family(&self) -> DialectFamily {
        match self {
            Dialect::PostgreSQL | Dialect::Greenplum => DialectFamily::PostgreSQL,
            Dialect::ClickHouse => DialectFamily::ClickHouse,
            Dialect::MsSql => DialectFamily::MsSql,
        }
    }

    /// Whether two dialects can share parsed fragments
    pub fn is_compatible_with(&self, other: Dialect) -> bool {
        self.family() == other.family()
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::PostgreSQL => "postgresql",
            Dialect::Greenplum => "greenplum",
            Dialect::ClickHouse => "clickhouse",
            Dialect::MsSql => "mssql",
        };
        f.write_str(name)
    }
}

/// Error returned when a dialect name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown SQL dialect: {0}")]
pub struct ParseDialectError(pub String);

impl FromStr for Dialect {
    type Err = ParseDialectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Dialect::PostgreSQL),
            "greenplum" | "gp" => Ok(Dialect::Greenplum),
            "clickhouse" | "ch" => Ok(Dialect::ClickHouse),
            "mssql" | "sqlserver" | "ms" => Ok(Dialect::MsSql),
            _ => Err(ParseDialectError(s.to_string())),
        }
    }
}

/// Dialect family groupings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialectFamily {
    PostgreSQL,
    ClickHouse,
    MsSql,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family() {
        assert_eq!(Dialect::Greenplum.family(), DialectFamily::PostgreSQL);
        assert!(Dialect::PostgreSQL.is_compatible_with(Dialect::Greenplum));
        assert!(!Dialect::PostgreSQL.is_compatible_with(Dialect::MsSql));
    }

    #[test]
    fn test_parse_round_trip_names() {
        assert_eq!("PG".parse::<Dialect>(), Ok(Dialect::PostgreSQL));
        assert_eq!("sqlserver".parse::<Dialect>(), Ok(Dialect::MsSql));
        assert!("oracle".parse::<Dialect>().is_err());
        assert_eq!(Dialect::ClickHouse.to_string(), "clickhouse");
    }
}
