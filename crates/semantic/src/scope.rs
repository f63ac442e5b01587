// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Scope management for semantic analysis
//!
//! This module defines scope types and the scope manager for tracking
//! tables, CTE names and routine variables across nested SQL queries.
//!
//! Scopes live in an arena owned by one walker invocation. A child scope keeps
//! its parent's id for fallback lookups only; nothing is ever written through
//! it. A [`ScopeType::Cte`] scope is *local*: unaliased-table and column lookups
//! stop there and never reach the statement that declares the CTE.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{SemanticError, SemanticResult};
use crate::symbol::{ColumnSymbol, TableSymbol};

/// Type of scope in a SQL query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScopeType {
    /// Root of a fragment; holds seeded tables and variables
    Statement,
    /// Top-level query or DML statement
    Query,
    /// Subquery or derived table
    Subquery,
    /// One branch of a set operation
    SetBranch,
    /// Body of a common table expression
    Cte,
}

/// A CTE name visible at some level, with the columns its body produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CteSymbol {
    pub name: String,
    pub columns: Vec<ColumnSymbol>,
}

/// A routine argument or `$n` placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableSymbol {
    pub name: String,
    pub data_type: Option<String>,
}

/// Represents a lexical scope in a SQL query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    /// Unique identifier for this scope
    pub id: usize,

    /// Parent scope ID (if any)
    pub parent_id: Option<usize>,

    /// Type of this scope
    pub scope_type: ScopeType,

    /// FROM entries in the order they were registered
    pub tables: Vec<TableSymbol>,

    /// CTEs declared at this level
    pub ctes: Vec<CteSymbol>,

    pub variables: Vec<VariableSymbol>,

    /// Table and column lookups do not continue into the parent
    pub is_local_scope: bool,

    /// Join columns shared by both sides through `USING` or `NATURAL`
    pub merged_columns: Vec<String>,
}

impl Scope {
    /// Create a new scope
    ///
    /// # Examples
    ///
    /// ```
    /// use schemadiff_semantic::{Scope, ScopeType};
    ///
    /// let scope = Scope::new(0, ScopeType::Cte);
    /// assert!(scope.is_local_scope);
    /// assert!(scope.tables.is_empty());
    /// ```
    pub fn new(id: usize, scope_type: ScopeType) -> Self {
        Self {
            id,
            parent_id: None,
            scope_type,
            tables: Vec::new(),
            ctes: Vec::new(),
            variables: Vec::new(),
            is_local_scope: scope_type == ScopeType::Cte,
            merged_columns: Vec::new(),
        }
    }

    /// Set the parent scope
    pub fn with_parent(mut self, parent_id: usize) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Tables registered with an alias
    pub fn aliased(&self) -> impl Iterator<Item = &TableSymbol> {
        self.tables.iter().filter(|t| t.alias.is_some())
    }

    /// Tables registered under their own name
    pub fn unaliased(&self) -> impl Iterator<Item = &TableSymbol> {
        self.tables.iter().filter(|t| t.alias.is_none())
    }

    /// Find an entry by exact alias in this scope only
    pub fn find_alias(&self, alias: &str) -> Option<&TableSymbol> {
        self.aliased().find(|t| {
            t.alias
                .as_deref()
                .is_some_and(|a| a.eq_ignore_ascii_case(alias))
        })
    }

    /// Add a table to this scope
    ///
    /// A second entry with the same alias, or a second unaliased entry for the
    /// same table, is rejected and the first one stays in place.
    pub fn add_table(&mut self, table: TableSymbol) -> SemanticResult<()> {
        let duplicate = match &table.alias {
            Some(alias) => {
                self.find_alias(alias).is_some()
                    || self.unaliased().any(|t| t.table_name.eq_ignore_ascii_case(alias))
            }
            None => self
                .unaliased()
                .any(|t| t.is_table(table.schema.as_deref(), &table.table_name)),
        };
        if duplicate {
            return Err(SemanticError::DuplicateAlias(table.display_name().to_string()));
        }

        self.tables.push(table);
        Ok(())
    }

    pub fn is_merged(&self, column: &str) -> bool {
        self.merged_columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    fn find_cte(&self, name: &str) -> Option<&CteSymbol> {
        self.ctes.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// A table found by [`ScopeManager::find_reference`]
#[derive(Debug, Clone, Copy)]
pub struct TableMatch<'a> {
    pub table: &'a TableSymbol,
    /// Scope the entry was registered in
    pub scope_id: usize,
    /// The requested column of `table`, when one was asked for and exists
    pub column: Option<&'a ColumnSymbol>,
    /// More than one entry matched; `table` is the first of them
    pub ambiguous: bool,
}

/// A column found by [`ScopeManager::find_column`]
#[derive(Debug, Clone, Copy)]
pub struct ColumnMatch<'a> {
    pub table: &'a TableSymbol,
    pub column: &'a ColumnSymbol,
    pub scope_id: usize,
    /// More than one relation at the same level exposes the column
    pub ambiguous: bool,
}

/// Manages hierarchical scopes and symbol resolution
///
/// The ScopeManager maintains a forest of scopes and provides methods for
/// resolving tables and columns across the scope hierarchy.
#[derive(Debug, Clone, Default)]
pub struct ScopeManager {
    /// All scopes managed by this manager
    scopes: Vec<Scope>,
}

impl ScopeManager {
    /// Create a new scope manager
    ///
    /// # Examples
    ///
    /// ```
    /// use schemadiff_semantic::ScopeManager;
    ///
    /// let manager = ScopeManager::new();
    /// assert_eq!(manager.scope_count(), 0);
    /// ```
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Create a new scope and return its id
    ///
    /// # Examples
    ///
    /// ```
    /// use schemadiff_semantic::{ScopeManager, ScopeType};
    ///
    /// let mut manager = ScopeManager::new();
    /// let parent_id = manager.create_scope(ScopeType::Query, None);
    /// let child_id = manager.create_scope(ScopeType::Subquery, Some(parent_id));
    ///
    /// assert!(child_id > parent_id);
    /// ```
    pub fn create_scope(&mut self, scope_type: ScopeType, parent_id: Option<usize>) -> usize {
        let id = self.scopes.len();
        let mut scope = Scope::new(id, scope_type);
        if let Some(parent) = parent_id {
            scope = scope.with_parent(parent);
        }
        self.scopes.push(scope);
        id
    }

    pub fn get_scope(&self, id: usize) -> Option<&Scope> {
        self.scopes.get(id)
    }

    pub fn get_scope_mut(&mut self, id: usize) -> Option<&mut Scope> {
        self.scopes.get_mut(id)
    }

    fn scope_mut(&mut self, id: usize) -> SemanticResult<&mut Scope> {
        self.scopes.get_mut(id).ok_or(SemanticError::InvalidScope(id))
    }

    /// Register a FROM entry in a scope
    ///
    /// # Errors
    ///
    /// `SemanticError::DuplicateAlias` when the alias (or the unaliased table)
    /// is already registered at this level; the walker reports it as a warning.
    pub fn add_table_reference(&mut self, scope_id: usize, table: TableSymbol) -> SemanticResult<()> {
        let scope = self.scope_mut(scope_id)?;
        let result = scope.add_table(table);
        if let Err(SemanticError::DuplicateAlias(name)) = &result {
            warn!(scope = scope_id, name = %name, "Duplicate table reference in scope");
        }
        result
    }

    /// Declare a CTE at `scope_id`, replacing an earlier one with the same name
    pub fn add_cte(
        &mut self,
        scope_id: usize,
        name: impl Into<String>,
        columns: Vec<ColumnSymbol>,
    ) -> SemanticResult<()> {
        let name = name.into();
        let scope = self.scope_mut(scope_id)?;
        scope.ctes.retain(|c| !c.name.eq_ignore_ascii_case(&name));
        scope.ctes.push(CteSymbol { name, columns });
        Ok(())
    }

    /// Replace the columns of a CTE once its body has been analysed
    pub fn set_cte_columns(&mut self, scope_id: usize, name: &str, columns: Vec<ColumnSymbol>) {
        if let Some(cte) = self
            .scopes
            .get_mut(scope_id)
            .and_then(|s| s.ctes.iter_mut().find(|c| c.name.eq_ignore_ascii_case(name)))
        {
            cte.columns = columns;
        }
    }

    /// Find a CTE visible from `scope_id`: this level first, then ancestors
    pub fn find_cte(&self, scope_id: usize, name: &str) -> Option<&CteSymbol> {
        self.ancestors(scope_id).find_map(|scope| scope.find_cte(name))
    }

    pub fn has_cte(&self, scope_id: usize, name: &str) -> bool {
        self.find_cte(scope_id, name).is_some()
    }

    /// Resolve a table qualifier
    ///
    /// At each level: an exact alias match wins when no schema is given; then
    /// unaliased entries named `name` (and in `schema` if given) are scanned.
    /// A schema-qualified match short-circuits. A name-only lookup that hits
    /// several unaliased entries returns the first registered one and flags
    /// the result as ambiguous, whether or not that entry exposes `column`.
    /// Otherwise the search moves to the parent unless this scope is local.
    pub fn find_reference(
        &self,
        scope_id: usize,
        schema: Option<&str>,
        name: &str,
        column: Option<&str>,
    ) -> Option<TableMatch<'_>> {
        for scope in self.bounded_ancestors(scope_id) {
            if schema.is_none() {
                if let Some(table) = scope.find_alias(name) {
                    return Some(TableMatch {
                        table,
                        column: column.and_then(|c| table.find_column(c)),
                        scope_id: scope.id,
                        ambiguous: false,
                    });
                }
            }

            let mut candidates = scope.unaliased().filter(|t| t.is_table(schema, name));
            let Some(table) = candidates.next() else {
                continue;
            };
            let others = if schema.is_some() { 0 } else { candidates.count() };
            let ambiguous = others > 0;
            if ambiguous {
                warn!(scope = scope.id, name, matches = others + 1, "Ambiguous table reference");
            }
            return Some(TableMatch {
                table,
                column: column.and_then(|c| table.find_column(c)),
                scope_id: scope.id,
                ambiguous,
            });
        }
        None
    }

    /// Mark `name` as a column merged by `USING` or `NATURAL` at this level
    pub fn merge_column(&mut self, scope_id: usize, name: &str) -> SemanticResult<()> {
        let scope = self.scope_mut(scope_id)?;
        if !scope.is_merged(name) {
            scope.merged_columns.push(name.to_string());
        }
        Ok(())
    }

    /// Resolve an unqualified column
    ///
    /// Aliased relations are searched before unaliased ones, then the parent
    /// level, with the same local-scope boundary as [`find_reference`]. A
    /// column merged by a join resolves to the leftmost relation exposing it
    /// and is never ambiguous.
    ///
    /// [`find_reference`]: ScopeManager::find_reference
    pub fn find_column(&self, scope_id: usize, name: &str) -> Option<ColumnMatch<'_>> {
        for scope in self.bounded_ancestors(scope_id) {
            if scope.is_merged(name) {
                let merged = scope
                    .tables
                    .iter()
                    .find_map(|table| table.find_column(name).map(|column| (table, column)));
                if let Some((table, column)) = merged {
                    return Some(ColumnMatch {
                        table,
                        column,
                        scope_id: scope.id,
                        ambiguous: false,
                    });
                }
            }

            let mut hits = scope
                .aliased()
                .chain(scope.unaliased())
                .filter_map(|table| table.find_column(name).map(|column| (table, column)));
            let Some((table, column)) = hits.next() else {
                continue;
            };
            let ambiguous = hits.next().is_some();
            if ambiguous {
                warn!(scope = scope.id, column = name, "Ambiguous column reference");
            }
            return Some(ColumnMatch {
                table,
                column,
                scope_id: scope.id,
                ambiguous,
            });
        }
        None
    }

    /// Declare a routine argument or placeholder
    pub fn declare_variable(
        &mut self,
        scope_id: usize,
        name: impl Into<String>,
        data_type: Option<String>,
    ) -> SemanticResult<()> {
        let scope = self.scope_mut(scope_id)?;
        scope.variables.push(VariableSymbol {
            name: name.into(),
            data_type,
        });
        Ok(())
    }

    /// Find a variable; variables are visible through every boundary
    pub fn find_variable(&self, scope_id: usize, name: &str) -> Option<&VariableSymbol> {
        self.ancestors(scope_id).find_map(|scope| {
            scope
                .variables
                .iter()
                .find(|v| v.name.eq_ignore_ascii_case(name))
        })
    }

    /// Get the total number of scopes
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    fn ancestors(&self, scope_id: usize) -> impl Iterator<Item = &Scope> {
        std::iter::successors(self.scopes.get(scope_id), move |scope| {
            scope.parent_id.and_then(|id| self.scopes.get(id))
        })
    }

    /// Ancestors up to and including the first local scope
    fn bounded_ancestors(&self, scope_id: usize) -> impl Iterator<Item = &Scope> {
        let mut stop = false;
        self.ancestors(scope_id).take_while(move |scope| {
            if stop {
                return false;
            }
            stop = scope.is_local_scope;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::RelationSource;
    use schemadiff_ir::ObjectKind;
    use tracing_test::traced_test;

    fn users() -> TableSymbol {
        TableSymbol::new("users").with_schema("public").with_columns(vec![
            ColumnSymbol::new("id", Some("int8"), "users"),
            ColumnSymbol::new("name", Some("text"), "users"),
        ])
    }

    fn orders(schema: &str) -> TableSymbol {
        let mut table = TableSymbol::new("orders").with_schema(schema).with_columns(vec![
            ColumnSymbol::new("id", Some("int8"), "orders"),
            ColumnSymbol::new("user_id", Some("int8"), "orders"),
        ]);
        table.source = Some(RelationSource {
            schema: schema.to_string(),
            name: "orders".to_string(),
            kind: ObjectKind::Table,
        });
        table
    }

    #[test]
    #[traced_test]
    fn test_duplicate_alias_keeps_first() {
        let mut manager = ScopeManager::new();
        let scope = manager.create_scope(ScopeType::Query, None);
        manager
            .add_table_reference(scope, users().with_alias("u"))
            .unwrap();
        let result = manager.add_table_reference(scope, orders("public").with_alias("U"));

        assert_eq!(result, Err(SemanticError::DuplicateAlias("U".to_string())));
        let found = manager.find_reference(scope, None, "u", None).unwrap();
        assert_eq!(found.table.table_name, "users");
        assert!(logs_contain("Duplicate table reference"));
    }

    #[test]
    fn test_duplicate_unaliased_table() {
        let mut scope = Scope::new(0, ScopeType::Query);
        scope.add_table(orders("public")).unwrap();
        assert!(scope.add_table(orders("public")).is_err());
        // Same name in another schema is a different table
        scope.add_table(orders("sales")).unwrap();
        assert_eq!(scope.tables.len(), 2);
    }

    #[test]
    fn test_alias_takes_precedence_over_table_name() {
        let mut manager = ScopeManager::new();
        let scope = manager.create_scope(ScopeType::Query, None);
        manager.add_table_reference(scope, users()).unwrap();
        manager
            .add_table_reference(scope, orders("public").with_alias("o"))
            .unwrap();

        let found = manager.find_reference(scope, None, "o", None).unwrap();
        assert_eq!(found.table.table_name, "orders");
        // The table name behind an alias is not a qualifier
        assert!(manager.find_reference(scope, None, "orders", None).is_none());
        let found = manager.find_reference(scope, None, "users", None).unwrap();
        assert_eq!(found.table.table_name, "users");
    }

    #[test]
    #[traced_test]
    fn test_name_only_lookup_is_ambiguous_across_schemas() {
        let mut manager = ScopeManager::new();
        let scope = manager.create_scope(ScopeType::Query, None);
        manager.add_table_reference(scope, orders("public")).unwrap();
        manager.add_table_reference(scope, orders("sales")).unwrap();

        let found = manager.find_reference(scope, None, "orders", None).unwrap();
        assert!(found.ambiguous);
        assert_eq!(found.table.schema.as_deref(), Some("public"));
        assert!(logs_contain("Ambiguous table reference"));

        let qualified = manager
            .find_reference(scope, Some("sales"), "orders", None)
            .unwrap();
        assert!(!qualified.ambiguous);
        assert_eq!(qualified.table.schema.as_deref(), Some("sales"));
    }

    #[test]
    #[traced_test]
    fn test_ambiguous_qualifier_ignores_column_availability() {
        let mut manager = ScopeManager::new();
        let scope = manager.create_scope(ScopeType::Query, None);
        manager
            .add_table_reference(scope, TableSymbol::new("orders").with_schema("archive"))
            .unwrap();
        manager.add_table_reference(scope, orders("sales")).unwrap();

        // Only sales.orders exposes user_id, but the first entry still wins
        let found = manager
            .find_reference(scope, None, "orders", Some("user_id"))
            .unwrap();
        assert!(found.ambiguous);
        assert_eq!(found.table.schema.as_deref(), Some("archive"));
        assert!(found.column.is_none());

        let qualified = manager
            .find_reference(scope, Some("sales"), "orders", Some("USER_ID"))
            .unwrap();
        assert_eq!(qualified.column.map(|c| c.name.as_str()), Some("user_id"));
        assert!(logs_contain("Ambiguous table reference"));
    }

    #[test]
    #[traced_test]
    fn test_merged_join_column_resolves_left() {
        let mut manager = ScopeManager::new();
        let scope = manager.create_scope(ScopeType::Query, None);
        manager.add_table_reference(scope, orders("public")).unwrap();
        manager.add_table_reference(scope, users()).unwrap();

        let before = manager.find_column(scope, "id").unwrap();
        assert!(before.ambiguous);

        manager.merge_column(scope, "ID").unwrap();
        let merged = manager.find_column(scope, "id").unwrap();
        assert!(!merged.ambiguous);
        assert_eq!(merged.table.table_name, "orders");
        assert_eq!(manager.get_scope(scope).unwrap().merged_columns.len(), 1);

        manager.merge_column(scope, "id").unwrap();
        assert_eq!(manager.get_scope(scope).unwrap().merged_columns.len(), 1);
        assert_eq!(manager.merge_column(9, "id"), Err(SemanticError::InvalidScope(9)));
    }

    #[test]
    fn test_find_column_prefers_aliased_and_flags_ambiguity() {
        let mut manager = ScopeManager::new();
        let scope = manager.create_scope(ScopeType::Query, None);
        manager.add_table_reference(scope, users()).unwrap();
        manager
            .add_table_reference(scope, orders("public").with_alias("o"))
            .unwrap();

        let id = manager.find_column(scope, "id").unwrap();
        assert_eq!(id.table.table_name, "orders");
        assert!(id.ambiguous);

        let name = manager.find_column(scope, "NAME").unwrap();
        assert_eq!(name.table.table_name, "users");
        assert!(!name.ambiguous);

        assert!(manager.find_column(scope, "missing").is_none());
    }

    #[test]
    fn test_subquery_sees_parent_but_cte_body_does_not() {
        let mut manager = ScopeManager::new();
        let root = manager.create_scope(ScopeType::Query, None);
        manager.add_table_reference(root, users()).unwrap();
        manager.add_cte(root, "recent", Vec::new()).unwrap();

        let subquery = manager.create_scope(ScopeType::Subquery, Some(root));
        assert!(manager.find_reference(subquery, None, "users", None).is_some());
        assert!(manager.find_column(subquery, "name").is_some());

        let cte_body = manager.create_scope(ScopeType::Cte, Some(root));
        let nested = manager.create_scope(ScopeType::Subquery, Some(cte_body));
        assert!(manager.find_reference(nested, None, "users", None).is_none());
        assert!(manager.find_column(nested, "name").is_none());
        // CTE names stay visible below the boundary
        assert!(manager.has_cte(nested, "RECENT"));
    }

    #[test]
    fn test_cte_never_visible_to_parent() {
        let mut manager = ScopeManager::new();
        let root = manager.create_scope(ScopeType::Query, None);
        let child = manager.create_scope(ScopeType::Subquery, Some(root));
        manager.add_cte(child, "inner_cte", Vec::new()).unwrap();

        assert!(manager.has_cte(child, "inner_cte"));
        assert!(!manager.has_cte(root, "inner_cte"));
    }

    #[test]
    fn test_cte_columns_update() {
        let mut manager = ScopeManager::new();
        let root = manager.create_scope(ScopeType::Query, None);
        manager.add_cte(root, "c", Vec::new()).unwrap();
        manager.set_cte_columns(root, "C", vec![ColumnSymbol::new("x", None, "c")]);
        assert_eq!(manager.find_cte(root, "c").unwrap().columns.len(), 1);
    }

    #[test]
    fn test_variables_cross_local_boundary() {
        let mut manager = ScopeManager::new();
        let root = manager.create_scope(ScopeType::Statement, None);
        manager
            .declare_variable(root, "$1", Some("int4".to_string()))
            .unwrap();
        let cte_body = manager.create_scope(ScopeType::Cte, Some(root));

        let variable = manager.find_variable(cte_body, "$1").unwrap();
        assert_eq!(variable.data_type.as_deref(), Some("int4"));
        assert!(manager.find_variable(cte_body, "$2").is_none());
    }

    #[test]
    fn test_invalid_scope() {
        let mut manager = ScopeManager::new();
        assert_eq!(
            manager.add_table_reference(7, users()),
            Err(SemanticError::InvalidScope(7))
        );
        assert!(manager.find_reference(7, None, "users", None).is_none());
    }
}
