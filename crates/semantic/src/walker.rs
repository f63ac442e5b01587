// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Dependency walker
//!
//! [`Walker`] visits one [`ParsedFragment`] and turns every name it can
//! resolve into an [`ObjectReference`]. The same implementation serves view
//! queries, rule actions, routine bodies and DDL sub-expressions; the dialect
//! differences live behind [`DialectOps`].
//!
//! ## Resolution order
//!
//! ```text
//! FROM items (aliases registered before their join condition)
//!   → WHERE → GROUP BY → HAVING → WINDOW → projection
//!   → ORDER BY / LIMIT / OFFSET of the enclosing query
//! ```
//!
//! Each nested SELECT, each set-operation branch and each `WITH` body gets its
//! own child scope. Output columns of a set operation come from its leftmost
//! branch.
//!
//! ## What becomes a dependency
//!
//! References to user objects go to [`WalkOutput::dependencies`] unless their
//! kind is disabled. Every reference, including system objects and builtins,
//! goes to [`WalkOutput::references`]. Names that resolve to nothing are
//! logged at debug level and dropped.

use std::collections::HashSet;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use schemadiff_catalog::{ColumnMetadata, MetadataSnapshot};
use schemadiff_ir::{
    ColumnRef, CommonTableExpr, DeleteStatement, DependencySet, DialectFamily, Expr,
    FragmentNode, FunctionCall, InsertSource, InsertStatement, JoinCondition, Literal,
    ObjectKind, ObjectReference, ParsedFragment, QualifiedName, Query, SelectItem,
    SelectStatement, SetOp, SourceSpan, Statement, TableFactor, TableRef, UnaryOp,
    UpdateStatement, WindowDef,
};

use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::dialect::{accepts_dialect, DialectOps};
use crate::error::{SemanticError, SemanticResult};
use crate::scope::{ScopeManager, ScopeType};
use crate::symbol::{ColumnSymbol, RelationSource, TableSymbol};

const SEQUENCE_FUNCTIONS: &[&str] = &["nextval", "currval", "setval"];

/// Everything one fragment analysis produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkOutput {
    /// Hard dependencies of the owning statement
    pub dependencies: DependencySet,
    /// Every reference found, including system objects
    pub references: DependencySet,
    pub diagnostics: Vec<Diagnostic>,
    /// Output columns of the last statement that produces rows
    pub columns: Vec<ColumnMetadata>,
}

/// Scope-aware dependency walker for one fragment
pub struct Walker<'a, D: DialectOps> {
    ops: D,
    snapshot: &'a dyn MetadataSnapshot,
    scopes: ScopeManager,
    root: usize,
    disabled: HashSet<ObjectKind>,
    cancel: Option<CancellationToken>,
    location: SourceSpan,
    dependencies: DependencySet,
    references: DependencySet,
    diagnostics: Vec<Diagnostic>,
    /// `COLUMNS('pattern')` uses, resolved once the walk is complete
    dynamic_columns: Vec<(String, SourceSpan)>,
}

impl<'a, D: DialectOps> Walker<'a, D> {
    pub fn new(ops: D, snapshot: &'a dyn MetadataSnapshot) -> Self {
        let mut scopes = ScopeManager::new();
        let root = scopes.create_scope(ScopeType::Statement, None);
        Self {
            ops,
            snapshot,
            scopes,
            root,
            disabled: HashSet::new(),
            cancel: None,
            location: SourceSpan::synthetic(),
            dependencies: DependencySet::new(),
            references: DependencySet::new(),
            diagnostics: Vec::new(),
            dynamic_columns: Vec::new(),
        }
    }

    /// Drop references of these kinds from the dependency set
    pub fn with_disabled_kinds(mut self, kinds: impl IntoIterator<Item = ObjectKind>) -> Self {
        self.disabled.extend(kinds);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Location used for diagnostics and references without a token of their own
    pub fn with_location(mut self, location: SourceSpan) -> Self {
        self.location = location;
        self
    }

    /// Make the table owning the fragment visible to unqualified names
    pub fn with_owner_table(mut self, schema: &str, name: &str) -> Self {
        let table = match self.snapshot.find_relation(Some(schema), name) {
            Some(relation) => TableSymbol::from_relation(&relation),
            None => {
                debug!(schema, table = name, "Owner table is not in the snapshot");
                TableSymbol::new(name).with_schema(schema)
            }
        };
        self.seed(table);
        self
    }

    /// Seed pseudo relations such as `NEW` and `OLD` with the columns of `schema.name`
    pub fn with_pseudo_relations(mut self, schema: &str, name: &str, aliases: &[&str]) -> Self {
        let columns = self
            .snapshot
            .find_relation(Some(schema), name)
            .map(|relation| TableSymbol::from_relation(&relation).columns)
            .unwrap_or_default();
        for alias in aliases {
            let pseudo = TableSymbol::new(name)
                .with_schema(schema)
                .with_alias(*alias)
                .with_columns(columns.clone());
            self.seed(pseudo);
        }
        self
    }

    /// Declare a routine argument or `$n` placeholder
    pub fn with_variable(mut self, name: impl Into<String>, data_type: Option<String>) -> Self {
        if let Err(err) = self.scopes.declare_variable(self.root, name, data_type) {
            debug!(error = %err, "Could not declare variable");
        }
        self
    }

    fn seed(&mut self, table: TableSymbol) {
        if let Err(err) = self.scopes.add_table_reference(self.root, table) {
            debug!(error = %err, "Ignoring seeded table");
        }
    }

    /// Analyse a fragment, consuming the walker
    ///
    /// # Errors
    ///
    /// `SemanticError::DialectMismatch` if the fragment belongs to another
    /// dialect family, `SemanticError::UnsupportedNode` for constructs that
    /// cannot be analysed, and `SemanticError::Cancelled` when the token fires
    /// between statements.
    pub fn analyze(mut self, fragment: &ParsedFragment) -> SemanticResult<WalkOutput> {
        if !accepts_dialect(&self.ops, fragment.dialect) {
            return Err(SemanticError::DialectMismatch {
                expected: self.ops.dialect(),
                found: fragment.dialect,
            });
        }
        if self.location.is_synthetic() {
            self.location = fragment.span;
        }

        let root = self.root;
        let mut columns = Vec::new();
        match &fragment.node {
            FragmentNode::Expr(expr) => {
                self.check_cancelled()?;
                self.walk_expr(expr, root)?;
            }
            FragmentNode::Exprs(exprs) => {
                self.check_cancelled()?;
                for expr in exprs {
                    self.walk_expr(expr, root)?;
                }
            }
            FragmentNode::Statements(statements) => {
                for statement in statements {
                    self.check_cancelled()?;
                    if let Some(output) = self.walk_statement(statement, root)? {
                        columns = output;
                    }
                }
            }
        }
        self.resolve_dynamic_columns();

        debug!(
            dependencies = self.dependencies.len(),
            references = self.references.len(),
            diagnostics = self.diagnostics.len(),
            "Fragment analysed"
        );
        Ok(WalkOutput {
            dependencies: self.dependencies,
            references: self.references,
            diagnostics: self.diagnostics,
            columns: columns.iter().map(ColumnSymbol::to_metadata).collect(),
        })
    }

    fn check_cancelled(&self) -> SemanticResult<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(SemanticError::Cancelled),
            _ => Ok(()),
        }
    }

    // ---- statements ------------------------------------------------------

    fn walk_statement(
        &mut self,
        statement: &Statement,
        scope: usize,
    ) -> SemanticResult<Option<Vec<ColumnSymbol>>> {
        match statement {
            Statement::Query(query) => self.walk_query(query, scope, ScopeType::Query).map(Some),
            Statement::Insert(insert) => self.walk_insert(insert, scope),
            Statement::Update(update) => self.walk_update(update, scope),
            Statement::Delete(delete) => self.walk_delete(delete, scope),
            Statement::Expr(expr) => {
                self.walk_expr(expr, scope)?;
                Ok(None)
            }
            Statement::Unsupported { kind, span } => Err(SemanticError::UnsupportedNode {
                kind: kind.clone(),
                location: *span,
            }),
        }
    }

    fn walk_insert(
        &mut self,
        insert: &InsertStatement,
        scope: usize,
    ) -> SemanticResult<Option<Vec<ColumnSymbol>>> {
        let dml = self.scopes.create_scope(ScopeType::Query, Some(scope));
        self.walk_ctes(&insert.ctes, insert.recursive, dml)?;

        // The source rows cannot see the target table
        match &insert.source {
            InsertSource::Values(rows) => {
                for expr in rows.iter().flatten() {
                    self.walk_expr(expr, dml)?;
                }
            }
            InsertSource::Query(query) => {
                self.walk_query(query, dml, ScopeType::Subquery)?;
            }
            InsertSource::DefaultValues => {}
        }

        let target = self.dml_target(&insert.table, insert.alias.as_deref(), dml)?;
        for column in &insert.columns {
            self.record_target_column(&target, column);
        }

        if let Some(on_conflict) = &insert.on_conflict {
            for column in &on_conflict.target {
                self.record_target_column(&target, column);
            }
            let mut excluded = target.clone().with_alias("excluded");
            excluded.source = None;
            self.register_table(dml, excluded, self.location)?;
            for assignment in &on_conflict.assignments {
                self.record_target_column(&target, &assignment.column);
                self.walk_expr(&assignment.value, dml)?;
            }
            if let Some(predicate) = &on_conflict.where_clause {
                self.walk_expr(predicate, dml)?;
            }
        }

        self.walk_returning(&insert.returning, dml)
    }

    fn walk_update(
        &mut self,
        update: &UpdateStatement,
        scope: usize,
    ) -> SemanticResult<Option<Vec<ColumnSymbol>>> {
        let dml = self.scopes.create_scope(ScopeType::Query, Some(scope));
        self.walk_ctes(&update.ctes, update.recursive, dml)?;
        let target = self.dml_target(&update.table, update.alias.as_deref(), dml)?;
        for item in &update.from {
            self.walk_table_ref(item, dml)?;
        }
        for assignment in &update.assignments {
            self.record_target_column(&target, &assignment.column);
            self.walk_expr(&assignment.value, dml)?;
        }
        if let Some(predicate) = &update.where_clause {
            self.walk_expr(predicate, dml)?;
        }
        self.walk_returning(&update.returning, dml)
    }

    fn walk_delete(
        &mut self,
        delete: &DeleteStatement,
        scope: usize,
    ) -> SemanticResult<Option<Vec<ColumnSymbol>>> {
        let dml = self.scopes.create_scope(ScopeType::Query, Some(scope));
        self.walk_ctes(&delete.ctes, delete.recursive, dml)?;
        self.dml_target(&delete.table, delete.alias.as_deref(), dml)?;
        for item in &delete.using {
            self.walk_table_ref(item, dml)?;
        }
        if let Some(predicate) = &delete.where_clause {
            self.walk_expr(predicate, dml)?;
        }
        self.walk_returning(&delete.returning, dml)
    }

    fn dml_target(
        &mut self,
        table: &QualifiedName,
        alias: Option<&str>,
        scope: usize,
    ) -> SemanticResult<TableSymbol> {
        let mut target = self.resolve_relation(table, scope);
        if let Some(alias) = alias {
            target = target.with_alias(alias);
        }
        self.register_table(scope, target.clone(), table.span)?;
        Ok(target)
    }

    fn record_target_column(&mut self, target: &TableSymbol, column: &ColumnRef) {
        if target.find_column(&column.column).is_some() {
            self.record_column(target.source.as_ref(), &column.column, column.span);
        } else {
            debug!(table = %target.table_name, column = %column.column, "Unresolved target column");
        }
    }

    fn walk_returning(
        &mut self,
        items: &[SelectItem],
        scope: usize,
    ) -> SemanticResult<Option<Vec<ColumnSymbol>>> {
        if items.is_empty() {
            return Ok(None);
        }
        self.walk_projection(items, scope).map(Some)
    }

    // ---- queries ---------------------------------------------------------

    fn walk_query(
        &mut self,
        query: &Query,
        parent: usize,
        scope_type: ScopeType,
    ) -> SemanticResult<Vec<ColumnSymbol>> {
        let scope = self.scopes.create_scope(scope_type, Some(parent));
        self.walk_query_in(query, scope)
    }

    fn walk_query_in(&mut self, query: &Query, scope: usize) -> SemanticResult<Vec<ColumnSymbol>> {
        self.walk_ctes(&query.ctes, query.recursive, scope)?;
        let columns = self.walk_set_op(&query.body, scope)?;

        for item in query.order_by.iter().flatten() {
            // ORDER BY may name an output column
            if let Expr::Column(column) = &item.expr {
                if column.table.is_none()
                    && columns.iter().any(|c| c.name.eq_ignore_ascii_case(&column.column))
                {
                    continue;
                }
            }
            self.walk_expr(&item.expr, scope)?;
        }
        if let Some(limit) = &query.limit {
            self.walk_expr(limit, scope)?;
        }
        if let Some(offset) = &query.offset {
            self.walk_expr(offset, scope)?;
        }
        Ok(columns)
    }

    fn walk_ctes(
        &mut self,
        ctes: &[CommonTableExpr],
        recursive: bool,
        scope: usize,
    ) -> SemanticResult<()> {
        for cte in ctes {
            if recursive {
                let declared = cte
                    .columns
                    .iter()
                    .map(|c| ColumnSymbol::new(c, None, &cte.name))
                    .collect();
                self.scopes.add_cte(scope, &cte.name, declared)?;
            }
            let body = self.scopes.create_scope(ScopeType::Cte, Some(scope));
            let produced = self.walk_query_in(&cte.query, body)?;
            let columns = rename_columns(produced, &cte.columns, &cte.name);
            self.scopes.add_cte(scope, &cte.name, columns)?;
        }
        Ok(())
    }

    fn walk_set_op(&mut self, body: &SetOp, scope: usize) -> SemanticResult<Vec<ColumnSymbol>> {
        match body {
            SetOp::Select(select) => self.walk_select(select, scope),
            SetOp::Union { left, right, .. }
            | SetOp::Intersect { left, right, .. }
            | SetOp::Except { left, right, .. } => {
                let columns = self.walk_query(left, scope, ScopeType::SetBranch)?;
                self.walk_query(right, scope, ScopeType::SetBranch)?;
                Ok(columns)
            }
            SetOp::Values(rows) => {
                let mut columns = Vec::new();
                for (row_index, row) in rows.iter().enumerate() {
                    for (index, expr) in row.iter().enumerate() {
                        let data_type = self.walk_expr(expr, scope)?;
                        if row_index == 0 {
                            columns.push(ColumnSymbol::new(
                                format!("column{}", index + 1),
                                data_type.as_deref(),
                                "",
                            ));
                        }
                    }
                }
                Ok(columns)
            }
        }
    }

    fn walk_select(
        &mut self,
        select: &SelectStatement,
        scope: usize,
    ) -> SemanticResult<Vec<ColumnSymbol>> {
        for item in &select.from {
            self.walk_table_ref(item, scope)?;
        }
        if let Some(predicate) = &select.where_clause {
            self.walk_expr(predicate, scope)?;
        }
        for expr in &select.group_by {
            self.walk_expr(expr, scope)?;
        }
        if let Some(having) = &select.having {
            self.walk_expr(having, scope)?;
        }
        for window in &select.window {
            self.walk_window(window, scope)?;
        }
        self.walk_projection(&select.projection, scope)
    }

    fn walk_projection(
        &mut self,
        items: &[SelectItem],
        scope: usize,
    ) -> SemanticResult<Vec<ColumnSymbol>> {
        let mut columns = Vec::new();
        for item in items {
            match item {
                SelectItem::UnnamedExpr(expr) => {
                    let data_type = self.walk_expr(expr, scope)?;
                    columns.push(ColumnSymbol::new(output_name(expr), data_type.as_deref(), ""));
                }
                SelectItem::AliasedExpr { expr, alias } => {
                    let data_type = self.walk_expr(expr, scope)?;
                    columns.push(ColumnSymbol::new(alias, data_type.as_deref(), ""));
                }
                SelectItem::Wildcard => {
                    let location = self.location;
                    columns.extend(self.expand_wildcard(scope, None, location));
                }
                SelectItem::QualifiedWildcard { table, span } => {
                    columns.extend(self.expand_wildcard(scope, Some(table.as_str()), *span));
                }
            }
        }
        Ok(columns)
    }

    fn expand_wildcard(
        &mut self,
        scope: usize,
        qualifier: Option<&str>,
        span: SourceSpan,
    ) -> Vec<ColumnSymbol> {
        let tables: Vec<TableSymbol> = match qualifier {
            None => self
                .scopes
                .get_scope(scope)
                .map(|s| s.tables.clone())
                .unwrap_or_default(),
            Some(name) => {
                let found = self
                    .scopes
                    .find_reference(scope, None, name, None)
                    .map(|found| found.table.clone());
                match found {
                    Some(table) => vec![table],
                    None => {
                        self.report_misplaced(name, span);
                        Vec::new()
                    }
                }
            }
        };

        let mut columns = Vec::new();
        for table in &tables {
            for column in &table.columns {
                self.record_column(table.source.as_ref(), &column.name, span);
                columns.push(column.clone());
            }
        }
        columns
    }

    // ---- FROM ------------------------------------------------------------

    fn walk_table_ref(&mut self, table_ref: &TableRef, scope: usize) -> SemanticResult<()> {
        self.walk_table_factor(&table_ref.factor, table_ref.alias.as_deref(), scope)?;
        for join in &table_ref.joins {
            let left = self.scopes.get_scope(scope).map_or(0, |s| s.tables.len());
            self.walk_table_ref(&join.table, scope)?;
            match &join.condition {
                JoinCondition::On(expr) => {
                    self.walk_expr(expr, scope)?;
                }
                JoinCondition::Using(columns) => {
                    for column in columns {
                        self.walk_using_column(column, scope)?;
                    }
                }
                JoinCondition::Natural => {
                    for column in self.natural_join_columns(scope, left) {
                        self.walk_using_column(&column, scope)?;
                    }
                }
                JoinCondition::None => {}
            }
        }
        Ok(())
    }

    fn walk_table_factor(
        &mut self,
        factor: &TableFactor,
        alias: Option<&str>,
        scope: usize,
    ) -> SemanticResult<()> {
        let (symbol, span) = match factor {
            TableFactor::Table(name) => (self.resolve_relation(name, scope), name.span),
            TableFactor::Derived { subquery, .. } => {
                let columns = self.walk_query(subquery, scope, ScopeType::Subquery)?;
                let Some(alias) = alias else {
                    // Unnamed derived tables only contribute their columns
                    if let Some(current) = self.scopes.get_scope_mut(scope) {
                        current.tables.push(TableSymbol::new("").with_columns(columns));
                    }
                    return Ok(());
                };
                (TableSymbol::new(alias).with_columns(columns), self.location)
            }
            TableFactor::Function(call) => {
                self.walk_function(call, scope)?;
                (TableSymbol::new(&call.name.name), call.name.span)
            }
            TableFactor::Nested(inner) => return self.walk_table_ref(inner, scope),
        };
        let symbol = match alias {
            Some(alias) => symbol.with_alias(alias),
            None => symbol,
        };
        self.register_table(scope, symbol, span)
    }

    fn register_table(
        &mut self,
        scope: usize,
        table: TableSymbol,
        span: SourceSpan,
    ) -> SemanticResult<()> {
        match self.scopes.add_table_reference(scope, table) {
            Ok(()) => Ok(()),
            Err(SemanticError::DuplicateAlias(name)) => {
                let message = format!(
                    "Table name {} specified more than once",
                    self.ops.quote_identifier(&name)
                );
                let location = self.at(span);
                self.diagnostics.push(
                    Diagnostic::warning(message, location).with_code(DiagnosticCode::DuplicateAlias),
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Resolve a relation named in FROM or as a DML target
    ///
    /// An unqualified name matching a visible CTE is the CTE and records
    /// nothing.
    fn resolve_relation(&mut self, name: &QualifiedName, scope: usize) -> TableSymbol {
        if name.schema.is_none() {
            if let Some(cte) = self.scopes.find_cte(scope, &name.name) {
                return TableSymbol::new(&cte.name).with_columns(cte.columns.clone());
            }
        }

        let schema = name.schema.as_deref();
        match self.snapshot.find_relation(schema, &name.name) {
            Some(relation) => {
                let mut symbol = TableSymbol::from_relation(&relation);
                let reference = ObjectReference::new(
                    relation.kind.object_kind(),
                    Some(relation.schema.clone()),
                    &relation.name,
                    name.span,
                );
                if self.ops.is_system_schema(&relation.schema) {
                    symbol.source = None;
                    self.add_outline(reference);
                } else {
                    self.add_dependency(reference);
                }
                symbol
            }
            None => {
                if schema.is_some_and(|s| self.ops.is_system_schema(s)) {
                    self.add_outline(ObjectReference::new(
                        ObjectKind::Table,
                        name.schema.clone(),
                        &name.name,
                        name.span,
                    ));
                } else {
                    debug!(relation = %name, "Unresolved relation reference");
                }
                match schema {
                    Some(schema) => TableSymbol::new(&name.name).with_schema(schema),
                    None => TableSymbol::new(&name.name),
                }
            }
        }
    }

    /// Column names shared by the entries registered before `left` and after it
    fn natural_join_columns(&self, scope: usize, left: usize) -> Vec<String> {
        let Some(current) = self.scopes.get_scope(scope) else {
            return Vec::new();
        };
        let (before, after) = current.tables.split_at(left.min(current.tables.len()));
        let mut columns: Vec<String> = Vec::new();
        for column in after.iter().flat_map(|t| t.columns.iter()) {
            let shared = before.iter().any(|t| t.find_column(&column.name).is_some());
            if shared && !columns.iter().any(|c| c.eq_ignore_ascii_case(&column.name)) {
                columns.push(column.name.clone());
            }
        }
        columns
    }

    fn walk_using_column(&mut self, column: &str, scope: usize) -> SemanticResult<()> {
        let sources: Vec<Option<RelationSource>> = self
            .scopes
            .get_scope(scope)
            .map(|s| {
                s.tables
                    .iter()
                    .filter(|t| t.find_column(column).is_some())
                    .map(|t| t.source.clone())
                    .collect()
            })
            .unwrap_or_default();
        if sources.is_empty() {
            debug!(column, "Unresolved USING column");
        }
        let location = self.location;
        for source in &sources {
            self.record_column(source.as_ref(), column, location);
        }
        self.scopes.merge_column(scope, column)
    }

    // ---- expressions -----------------------------------------------------

    /// Walk an expression, returning its inferred type when known
    fn walk_expr(&mut self, expr: &Expr, scope: usize) -> SemanticResult<Option<String>> {
        match expr {
            Expr::Column(column) => Ok(self.walk_column(column, scope)),
            Expr::Literal { value, .. } => Ok(self.ops.literal_type(value).map(str::to_string)),
            Expr::BinaryOp { left, op, right } => {
                let left_type = self.walk_expr(left, scope)?;
                let right_type = self.walk_expr(right, scope)?;
                if op.is_predicate() {
                    Ok(Some(self.ops.boolean_type().to_string()))
                } else {
                    Ok(left_type.or(right_type))
                }
            }
            Expr::UnaryOp { op, expr } => {
                let inner = self.walk_expr(expr, scope)?;
                Ok(match op {
                    UnaryOp::Neg => inner,
                    UnaryOp::Not | UnaryOp::IsNull | UnaryOp::IsNotNull => {
                        Some(self.ops.boolean_type().to_string())
                    }
                })
            }
            Expr::Operator { name, left, right } => {
                self.walk_operator(name, left.as_deref(), right.as_deref(), scope)
            }
            Expr::Function(call) => self.walk_function(call, scope),
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                if let Some(operand) = operand {
                    self.walk_expr(operand, scope)?;
                }
                for condition in conditions {
                    self.walk_expr(condition, scope)?;
                }
                let mut result_type = None;
                for result in results.iter().chain(else_result.as_deref()) {
                    let data_type = self.walk_expr(result, scope)?;
                    if result_type.is_none() {
                        result_type = data_type;
                    }
                }
                Ok(result_type)
            }
            Expr::Cast { expr, type_name } => {
                self.walk_expr(expr, scope)?;
                if let Expr::Literal {
                    value: Literal::String(text),
                    span,
                } = expr.as_ref()
                {
                    self.walk_object_identifier(text, *span, type_name);
                }
                self.resolve_type(type_name);
                Ok(Some(type_name.to_string()))
            }
            Expr::Collate { expr, collation } => {
                let data_type = self.walk_expr(expr, scope)?;
                self.walk_collation(collation);
                Ok(data_type)
            }
            Expr::Paren(inner) => self.walk_expr(inner, scope),
            Expr::List(items) => {
                let mut list_type = None;
                for item in items {
                    let data_type = self.walk_expr(item, scope)?;
                    if list_type.is_none() {
                        list_type = data_type;
                    }
                }
                Ok(list_type)
            }
            Expr::Subquery(query) => {
                let columns = self.walk_query(query, scope, ScopeType::Subquery)?;
                Ok(columns.into_iter().next().and_then(|c| c.data_type))
            }
            Expr::Exists(query) => {
                self.walk_query(query, scope, ScopeType::Subquery)?;
                Ok(Some(self.ops.boolean_type().to_string()))
            }
            Expr::InSubquery { expr, query, .. } => {
                self.walk_expr(expr, scope)?;
                self.walk_query(query, scope, ScopeType::Subquery)?;
                Ok(Some(self.ops.boolean_type().to_string()))
            }
            Expr::Parameter(parameter) => {
                let key = parameter.key();
                match self.scopes.find_variable(scope, &key) {
                    Some(variable) => Ok(variable.data_type.clone()),
                    None => {
                        debug!(parameter = %key, "Undeclared routine parameter");
                        Ok(None)
                    }
                }
            }
            Expr::Columns { pattern, span } => {
                self.dynamic_columns.push((pattern.clone(), *span));
                Ok(None)
            }
            Expr::Unsupported { kind, span } => Err(SemanticError::UnsupportedNode {
                kind: kind.clone(),
                location: *span,
            }),
        }
    }

    fn walk_column(&mut self, column: &ColumnRef, scope: usize) -> Option<String> {
        let Some(table) = column.table.as_deref() else {
            return self.walk_unqualified_column(column, scope);
        };

        let schema = column.schema.as_deref();
        let found = self
            .scopes
            .find_reference(scope, schema, table, Some(&column.column))
            .map(|found| {
                (
                    found.ambiguous,
                    found.table.source.clone(),
                    found.column.map(|c| c.data_type.clone()),
                )
            });

        match found {
            Some((ambiguous, source, column_type)) => {
                if ambiguous {
                    self.report_ambiguous(&column.qualified(), column.span);
                }
                match column_type {
                    Some(data_type) => {
                        self.record_column(source.as_ref(), &column.column, column.span);
                        data_type
                    }
                    None => {
                        debug!(column = %column.qualified(), "Column not found in referenced table");
                        None
                    }
                }
            }
            // Field of a record-typed routine variable
            None if schema.is_none() && self.scopes.find_variable(scope, table).is_some() => None,
            None => {
                let qualifier = match schema {
                    Some(schema) => format!("{}.{}", schema, table),
                    None => table.to_string(),
                };
                self.report_misplaced(&qualifier, column.span);
                None
            }
        }
    }

    fn walk_unqualified_column(&mut self, column: &ColumnRef, scope: usize) -> Option<String> {
        let found = self.scopes.find_column(scope, &column.column).map(|found| {
            (
                found.ambiguous,
                found.table.source.clone(),
                found.column.data_type.clone(),
            )
        });
        if let Some((ambiguous, source, data_type)) = found {
            if ambiguous {
                self.report_ambiguous(&column.column, column.span);
            }
            self.record_column(source.as_ref(), &column.column, column.span);
            return data_type;
        }

        if let Some(variable) = self.scopes.find_variable(scope, &column.column) {
            return variable.data_type.clone();
        }
        debug!(column = %column.column, "Unresolved column reference");
        None
    }

    fn walk_operator(
        &mut self,
        name: &QualifiedName,
        left: Option<&Expr>,
        right: Option<&Expr>,
        scope: usize,
    ) -> SemanticResult<Option<String>> {
        let left_type = match left {
            Some(expr) => self.walk_expr(expr, scope)?,
            None => None,
        };
        let right_type = match right {
            Some(expr) => self.walk_expr(expr, scope)?,
            None => None,
        };
        let operand_type = left_type.or(right_type);

        let schema = name.schema.as_deref();
        if schema.is_some_and(|s| self.ops.is_system_schema(s)) {
            self.add_outline(ObjectReference::new(
                ObjectKind::Operator,
                name.schema.clone(),
                &name.name,
                name.span,
            ));
            return Ok(operand_type);
        }

        match self.snapshot.find_operator(schema, &name.name) {
            Some(operator) => {
                self.record(ObjectReference::new(
                    ObjectKind::Operator,
                    Some(operator.schema.clone()),
                    &operator.name,
                    name.span,
                ));
                Ok(operator.return_type.or(operand_type))
            }
            None => {
                debug!(operator = %name, "Unresolved operator reference");
                Ok(operand_type)
            }
        }
    }

    fn walk_function(
        &mut self,
        call: &FunctionCall,
        scope: usize,
    ) -> SemanticResult<Option<String>> {
        for arg in &call.args {
            self.walk_expr(arg, scope)?;
        }
        if let Some(filter) = &call.filter {
            self.walk_expr(filter, scope)?;
        }
        if let Some(window) = &call.over {
            self.walk_window(window, scope)?;
        }
        self.walk_sequence_function(call);

        let name = &call.name;
        let schema = name.schema.as_deref();
        if schema.is_some_and(|s| self.ops.is_system_schema(s)) {
            self.add_outline(ObjectReference::new(
                ObjectKind::Function,
                name.schema.clone(),
                &name.name,
                name.span,
            ));
            return Ok(None);
        }

        if let Some(function) = self.snapshot.find_function(schema, &name.name) {
            self.record(ObjectReference::new(
                function.kind.object_kind(),
                Some(function.schema.clone()),
                &function.name,
                name.span,
            ));
            return Ok(function.return_type);
        }

        if schema.is_none() && self.ops.is_builtin_function(&name.name) {
            let system = self.ops.system_schema().to_string();
            self.add_outline(ObjectReference::new(
                ObjectKind::Function,
                Some(system),
                &name.name,
                name.span,
            ));
        } else {
            debug!(function = %name, "Unresolved function reference");
        }
        Ok(None)
    }

    /// `nextval('s.seq')` and friends name a sequence in a string literal
    fn walk_sequence_function(&mut self, call: &FunctionCall) {
        if self.ops.dialect().family() != DialectFamily::PostgreSQL {
            return;
        }
        let schema = call.name.schema.as_deref();
        if schema.is_some_and(|s| !s.eq_ignore_ascii_case("pg_catalog")) {
            return;
        }
        if !SEQUENCE_FUNCTIONS
            .iter()
            .any(|f| f.eq_ignore_ascii_case(&call.name.name))
        {
            return;
        }
        if let Some(Expr::Literal {
            value: Literal::String(text),
            span,
        }) = call.args.first()
        {
            self.resolve_literal_relation(text, *span);
        }
    }

    /// `'s.t'::regclass`, `'s.ty'::regtype`, `'s.f'::regproc`
    fn walk_object_identifier(&mut self, text: &str, span: SourceSpan, type_name: &QualifiedName) {
        if self.ops.dialect().family() != DialectFamily::PostgreSQL {
            return;
        }
        if type_name
            .schema
            .as_deref()
            .is_some_and(|s| !s.eq_ignore_ascii_case("pg_catalog"))
        {
            return;
        }
        match type_name.name.to_ascii_lowercase().as_str() {
            "regclass" => self.resolve_literal_relation(text, span),
            "regtype" => match QualifiedName::parse_dotted(text, span) {
                Some(name) => self.resolve_type(&name),
                None => debug!(literal = text, "Malformed regtype literal"),
            },
            "regproc" | "regprocedure" => {
                let base = text.split('(').next().unwrap_or(text);
                let Some(name) = QualifiedName::parse_dotted(base, span) else {
                    debug!(literal = text, "Malformed regproc literal");
                    return;
                };
                match self.snapshot.find_function(name.schema.as_deref(), &name.name) {
                    Some(function) => self.record(ObjectReference::new(
                        function.kind.object_kind(),
                        Some(function.schema.clone()),
                        &function.name,
                        span,
                    )),
                    None => debug!(function = %name, "Unresolved regproc literal"),
                }
            }
            _ => {}
        }
    }

    fn resolve_literal_relation(&mut self, text: &str, span: SourceSpan) {
        let Some(name) = QualifiedName::parse_dotted(text, span) else {
            debug!(literal = text, "Malformed relation literal");
            return;
        };
        match self.snapshot.find_relation(name.schema.as_deref(), &name.name) {
            Some(relation) => self.record(ObjectReference::new(
                relation.kind.object_kind(),
                Some(relation.schema.clone()),
                &relation.name,
                span,
            )),
            None => debug!(relation = %name, "Unresolved relation literal"),
        }
    }

    fn resolve_type(&mut self, name: &QualifiedName) {
        if self.ops.is_system_type(name) {
            return;
        }
        let base = strip_type_modifiers(&name.name);
        match self.snapshot.find_type(name.schema.as_deref(), base) {
            Some(ty) => self.record(ObjectReference::new(
                ty.object_kind(),
                Some(ty.schema.clone()),
                &ty.name,
                name.span,
            )),
            None => debug!(type_name = %name, "Unresolved type reference"),
        }
    }

    fn walk_collation(&mut self, collation: &QualifiedName) {
        // Unqualified collations are server collations
        if collation.schema.is_none() {
            return;
        }
        self.record(ObjectReference::new(
            ObjectKind::Collation,
            collation.schema.clone(),
            &collation.name,
            collation.span,
        ));
    }

    fn walk_window(&mut self, window: &WindowDef, scope: usize) -> SemanticResult<()> {
        for expr in &window.partition_by {
            self.walk_expr(expr, scope)?;
        }
        for item in &window.order_by {
            self.walk_expr(&item.expr, scope)?;
        }
        Ok(())
    }

    /// Match `COLUMNS('pattern')` against the columns of every relation
    /// dependency found during the walk
    fn resolve_dynamic_columns(&mut self) {
        let patterns = std::mem::take(&mut self.dynamic_columns);
        if patterns.is_empty() {
            return;
        }
        let relations: Vec<ObjectReference> = self
            .dependencies
            .iter()
            .filter(|r| r.column.is_none() && matches!(r.kind, ObjectKind::Table | ObjectKind::View))
            .cloned()
            .collect();

        for (pattern, span) in patterns {
            let matcher = ColumnPattern::new(&pattern);
            for relation in &relations {
                let columns = match self
                    .snapshot
                    .get_columns(relation.schema.as_deref(), &relation.name)
                {
                    Ok(columns) => columns,
                    Err(err) => {
                        debug!(relation = %relation, error = %err, "No columns for COLUMNS pattern");
                        continue;
                    }
                };
                for column in columns.iter().filter(|c| matcher.matches(&c.name)) {
                    self.add_dependency(ObjectReference::column(
                        relation.schema.clone(),
                        &relation.name,
                        &column.name,
                        span,
                    ));
                }
            }
        }
    }

    // ---- recording -------------------------------------------------------

    fn record_column(&mut self, source: Option<&RelationSource>, column: &str, span: SourceSpan) {
        if let Some(source) = source {
            self.add_dependency(ObjectReference::column(
                Some(source.schema.clone()),
                &source.name,
                column,
                span,
            ));
        }
    }

    /// Record a resolved reference, as an outline reference only when it
    /// lives in a system schema
    fn record(&mut self, reference: ObjectReference) {
        let system = reference
            .schema
            .as_deref()
            .is_some_and(|s| self.ops.is_system_schema(s));
        if system {
            self.add_outline(reference);
        } else {
            self.add_dependency(reference);
        }
    }

    fn add_dependency(&mut self, reference: ObjectReference) {
        self.references.insert(reference.clone());
        if self.disabled.contains(&reference.kind) {
            debug!(reference = %reference, "Suppressed dependency of disabled kind");
            return;
        }
        self.dependencies.insert(reference);
    }

    fn add_outline(&mut self, reference: ObjectReference) {
        self.references.insert(reference);
    }

    fn report_ambiguous(&mut self, name: &str, span: SourceSpan) {
        let message = format!("Reference {} is ambiguous", self.ops.quote_identifier(name));
        let location = self.at(span);
        self.diagnostics.push(
            Diagnostic::warning(message, location).with_code(DiagnosticCode::AmbiguousReference),
        );
    }

    fn report_misplaced(&mut self, qualifier: &str, span: SourceSpan) {
        debug!(qualifier, "Qualifier names no FROM entry");
        let message = format!(
            "Missing FROM-clause entry for table {}",
            self.ops.quote_identifier(qualifier)
        );
        let location = self.at(span);
        self.diagnostics
            .push(Diagnostic::error(message, location).with_code(DiagnosticCode::UndefinedTable));
    }

    fn at(&self, span: SourceSpan) -> SourceSpan {
        if span.is_synthetic() {
            self.location
        } else {
            span
        }
    }
}

enum ColumnPattern {
    Regex(Regex),
    Substring(String),
}

impl ColumnPattern {
    fn new(pattern: &str) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => ColumnPattern::Regex(regex),
            Err(err) => {
                debug!(pattern, error = %err, "Invalid COLUMNS pattern, matching as substring");
                ColumnPattern::Substring(pattern.to_string())
            }
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            ColumnPattern::Regex(regex) => regex.is_match(name),
            ColumnPattern::Substring(text) => name.contains(text.as_str()),
        }
    }
}

/// Name of an output column the way the server derives it
fn output_name(expr: &Expr) -> String {
    match expr {
        Expr::Column(column) => column.column.clone(),
        Expr::Function(call) => call.name.name.clone(),
        Expr::Cast { expr, type_name } => match expr.as_ref() {
            Expr::Column(_) | Expr::Function(_) | Expr::Cast { .. } => output_name(expr),
            _ => type_name.name.clone(),
        },
        Expr::Paren(inner) => output_name(inner),
        Expr::Case { .. } => "case".to_string(),
        Expr::Exists(_) => "exists".to_string(),
        _ => "?column?".to_string(),
    }
}

/// Apply a CTE's column list positionally to the columns its body produced
fn rename_columns(produced: Vec<ColumnSymbol>, names: &[String], table: &str) -> Vec<ColumnSymbol> {
    let produced_len = produced.len();
    let mut columns: Vec<ColumnSymbol> = produced
        .into_iter()
        .enumerate()
        .map(|(index, mut column)| {
            if let Some(name) = names.get(index) {
                column.name = name.clone();
            }
            column.table_name = table.to_string();
            column
        })
        .collect();
    columns.extend(
        names
            .iter()
            .skip(produced_len)
            .map(|name| ColumnSymbol::new(name, None, table)),
    );
    columns
}

/// `varchar(20)` → `varchar`, `mood[]` → `mood`
fn strip_type_modifiers(name: &str) -> &str {
    name.split(&['(', '['][..])
        .next()
        .unwrap_or(name)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name() {
        assert_eq!(output_name(&Expr::column("a")), "a");
        assert_eq!(
            output_name(&Expr::call(QualifiedName::new("lower"), vec![])),
            "lower"
        );
        assert_eq!(
            output_name(&Expr::cast(Expr::column("a"), QualifiedName::new("int8"))),
            "a"
        );
        assert_eq!(
            output_name(&Expr::cast(
                Expr::literal(Literal::Integer(1)),
                QualifiedName::new("int8")
            )),
            "int8"
        );
        assert_eq!(output_name(&Expr::literal(Literal::Null)), "?column?");
    }

    #[test]
    fn test_rename_columns() {
        let produced = vec![
            ColumnSymbol::new("x", Some("int4"), ""),
            ColumnSymbol::new("y", None, ""),
        ];
        let renamed = rename_columns(produced, &["a".to_string()], "c");
        assert_eq!(renamed[0].name, "a");
        assert_eq!(renamed[0].data_type.as_deref(), Some("int4"));
        assert_eq!(renamed[1].name, "y");
        assert!(renamed.iter().all(|c| c.table_name == "c"));

        let extended = rename_columns(Vec::new(), &["n".to_string()], "c");
        assert_eq!(extended.len(), 1);
    }

    #[test]
    fn test_strip_type_modifiers() {
        assert_eq!(strip_type_modifiers("varchar(20)"), "varchar");
        assert_eq!(strip_type_modifiers("mood[]"), "mood");
        assert_eq!(strip_type_modifiers("mood"), "mood");
    }

    #[test]
    fn test_column_pattern_falls_back_to_substring() {
        assert!(ColumnPattern::new("^price_").matches("price_usd"));
        assert!(!ColumnPattern::new("^price_").matches("base_price_usd"));
        assert!(ColumnPattern::new("price_(").matches("price_(raw)"));
    }
}
