// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Dialect capabilities
//!
//! The walker is the same for every dialect; what differs is captured by the
//! small [`DialectOps`] trait: which schemas hold system objects, which
//! functions and types are built in, how identifiers are quoted and which type
//! a literal has.

use schemadiff_ir::{Dialect, DialectFamily, Literal, QualifiedName};

/// Dialect-specific knowledge consulted by the walker
pub trait DialectOps {
    /// The dialect fragments must be parsed with
    fn dialect(&self) -> Dialect;

    /// Whether objects in `schema` belong to the server, not to the user
    fn is_system_schema(&self, schema: &str) -> bool;

    /// Quote an identifier for messages
    fn quote_identifier(&self, name: &str) -> String;

    /// Schema that holds the server's builtin objects
    fn system_schema(&self) -> &str;

    /// Whether an unqualified function name is a server builtin
    fn is_builtin_function(&self, name: &str) -> bool;

    /// Whether a type name denotes a server type
    fn is_system_type(&self, name: &QualifiedName) -> bool;

    /// Type of a literal, `None` for `NULL`
    fn literal_type(&self, literal: &Literal) -> Option<&'static str>;

    /// Type produced by comparisons and predicates
    fn boolean_type(&self) -> &'static str;
}

const PG_SYSTEM_SCHEMAS: &[&str] = &["pg_catalog", "information_schema", "pg_toast"];

const PG_BUILTIN_FUNCTIONS: &[&str] = &[
    "abs", "array_agg", "avg", "btrim", "ceil", "char_length", "coalesce", "concat",
    "count", "current_date", "current_setting", "current_timestamp", "currval",
    "date_part", "date_trunc", "floor", "format", "generate_series", "greatest",
    "json_agg", "jsonb_agg", "jsonb_build_object", "least", "left", "length", "lower",
    "max", "md5", "min", "nextval", "now", "nullif", "random", "regexp_replace",
    "replace", "right", "round", "row_number", "setval", "split_part", "string_agg",
    "substring", "sum", "to_char", "to_date", "to_timestamp", "trim", "unnest", "upper",
];

const PG_SYSTEM_TYPES: &[&str] = &[
    "bigint", "bigserial", "bit", "bool", "boolean", "bytea", "char", "character",
    "character varying", "cidr", "date", "decimal", "double precision", "float4",
    "float8", "inet", "int", "int2", "int4", "int8", "integer", "interval", "json",
    "jsonb", "money", "name", "numeric", "oid", "real", "regclass", "regproc",
    "regprocedure", "regtype", "serial", "smallint", "text", "time", "timestamp",
    "timestamptz", "tsvector", "uuid", "varchar", "void", "xml",
];

/// PostgreSQL and Greenplum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostgresOps {
    dialect: Dialect,
}

impl PostgresOps {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }
}

impl Default for PostgresOps {
    fn default() -> Self {
        Self::new(Dialect::PostgreSQL)
    }
}

impl DialectOps for PostgresOps {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn is_system_schema(&self, schema: &str) -> bool {
        let schema = schema.to_ascii_lowercase();
        PG_SYSTEM_SCHEMAS.contains(&schema.as_str())
            || (self.dialect == Dialect::Greenplum && schema == "gp_toolkit")
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn system_schema(&self) -> &str {
        "pg_catalog"
    }

    fn is_builtin_function(&self, name: &str) -> bool {
        PG_BUILTIN_FUNCTIONS.contains(&name.to_ascii_lowercase().as_str())
    }

    fn is_system_type(&self, name: &QualifiedName) -> bool {
        match &name.schema {
            Some(schema) => self.is_system_schema(schema),
            None => {
                let lowered = name.name.to_ascii_lowercase();
                let base = lowered
                    .split(&['(', '['][..])
                    .next()
                    .unwrap_or_default()
                    .trim();
                PG_SYSTEM_TYPES.contains(&base)
            }
        }
    }

    fn literal_type(&self, literal: &Literal) -> Option<&'static str> {
        match literal {
            Literal::Null => None,
            Literal::Boolean(_) => Some("boolean"),
            Literal::Integer(_) => Some("integer"),
            Literal::Float(_) => Some("numeric"),
            Literal::String(_) => Some("text"),
        }
    }

    fn boolean_type(&self) -> &'static str {
        "boolean"
    }
}

/// ClickHouse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickHouseOps;

impl DialectOps for ClickHouseOps {
    fn dialect(&self) -> Dialect {
        Dialect::ClickHouse
    }

    fn is_system_schema(&self, schema: &str) -> bool {
        matches!(schema, "system" | "INFORMATION_SCHEMA" | "information_schema")
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "\\`"))
    }

    fn system_schema(&self) -> &str {
        "system"
    }

    fn is_builtin_function(&self, name: &str) -> bool {
        // User-defined functions in ClickHouse are global and unqualified; any
        // name the snapshot does not know is treated as a builtin
        !name.is_empty()
    }

    fn is_system_type(&self, name: &QualifiedName) -> bool {
        name.schema.is_none()
    }

    fn literal_type(&self, literal: &Literal) -> Option<&'static str> {
        match literal {
            Literal::Null => None,
            Literal::Boolean(_) => Some("Bool"),
            Literal::Integer(_) => Some("Int64"),
            Literal::Float(_) => Some("Float64"),
            Literal::String(_) => Some("String"),
        }
    }

    fn boolean_type(&self) -> &'static str {
        "UInt8"
    }
}

/// Microsoft SQL Server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsSqlOps;

const MSSQL_SYSTEM_TYPES: &[&str] = &[
    "bigint", "binary", "bit", "char", "date", "datetime", "datetime2", "datetimeoffset",
    "decimal", "float", "image", "int", "money", "nchar", "ntext", "numeric", "nvarchar",
    "real", "smalldatetime", "smallint", "smallmoney", "sql_variant", "sysname", "text",
    "time", "timestamp", "tinyint", "uniqueidentifier", "varbinary", "varchar", "xml",
];

impl DialectOps for MsSqlOps {
    fn dialect(&self) -> Dialect {
        Dialect::MsSql
    }

    fn is_system_schema(&self, schema: &str) -> bool {
        schema.eq_ignore_ascii_case("sys") || schema.eq_ignore_ascii_case("INFORMATION_SCHEMA")
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("[{}]", name.replace(']', "]]"))
    }

    fn system_schema(&self) -> &str {
        "sys"
    }

    fn is_builtin_function(&self, name: &str) -> bool {
        // Builtins are never schema-qualified, user functions always are
        !name.contains('.')
    }

    fn is_system_type(&self, name: &QualifiedName) -> bool {
        match &name.schema {
            Some(schema) => self.is_system_schema(schema),
            None => {
                let lowered = name.name.to_ascii_lowercase();
                let base = lowered.split('(').next().unwrap_or_default().trim();
                MSSQL_SYSTEM_TYPES.contains(&base)
            }
        }
    }

    fn literal_type(&self, literal: &Literal) -> Option<&'static str> {
        match literal {
            Literal::Null => None,
            Literal::Boolean(_) => Some("bit"),
            Literal::Integer(_) => Some("int"),
            Literal::Float(_) => Some("numeric"),
            Literal::String(_) => Some("varchar"),
        }
    }

    fn boolean_type(&self) -> &'static str {
        "bit"
    }
}

/// Whether a fragment produced for `found` can be walked with `ops`
pub fn accepts_dialect(ops: &impl DialectOps, found: Dialect) -> bool {
    let expected: DialectFamily = ops.dialect().family();
    expected == found.family()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_system_objects() {
        let ops = PostgresOps::default();
        assert!(ops.is_system_schema("PG_CATALOG"));
        assert!(!ops.is_system_schema("public"));
        assert!(ops.is_builtin_function("NOW"));
        assert!(ops.is_system_type(&QualifiedName::new("varchar(20)")));
        assert!(ops.is_system_type(&QualifiedName::new("int4[]")));
        assert!(!ops.is_system_type(&QualifiedName::new("mood")));
        assert!(!ops.is_system_type(&QualifiedName::new("int4").with_schema("app")));
    }

    #[test]
    fn test_greenplum_toolkit_schema() {
        assert!(PostgresOps::new(Dialect::Greenplum).is_system_schema("gp_toolkit"));
        assert!(!PostgresOps::default().is_system_schema("gp_toolkit"));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(PostgresOps::default().quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(ClickHouseOps.quote_identifier("events"), "`events`");
        assert_eq!(MsSqlOps.quote_identifier("x]y"), "[x]]y]");
    }

    #[test]
    fn test_accepts_dialect_by_family() {
        assert!(accepts_dialect(&PostgresOps::default(), Dialect::Greenplum));
        assert!(!accepts_dialect(&MsSqlOps, Dialect::PostgreSQL));
    }
}
