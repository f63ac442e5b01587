// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Analysis launchers
//!
//! A launcher is a deferred unit of analysis: one parsed fragment together with
//! the statement that owns it and the scope it must be walked in. The loader
//! queues launchers while it builds the [`Database`]; the full pass runs them.
//!
//! ## Seeding per kind
//!
//! | kind | initial scope |
//! |---|---|
//! | column default, constraint, index | the owning table |
//! | trigger WHEN | the owning table plus `NEW` and `OLD` |
//! | rule | `NEW` and `OLD` |
//! | view | empty; output columns are inferred |
//! | routine | `$1..$n` and the named arguments |
//! | operator, aggregate | no walk; the implementation's return type is copied |
//!
//! Running a launcher never touches the database. It produces a
//! [`LaunchOutcome`] which is applied later on the thread that owns the
//! database.

use std::fmt;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use schemadiff_catalog::{ColumnMetadata, MetadataSnapshot};
use schemadiff_ir::{
    DependencySet, Dialect, DialectFamily, FunctionParameter, ObjectKind, ParsedFragment,
    QualifiedName, SourceSpan,
};
use schemadiff_schema::{Database, StatementId};
use schemadiff_semantic::{
    ClickHouseOps, Diagnostic, DialectOps, MsSqlOps, PostgresOps, SemanticError, SemanticResult,
    WalkOutput, Walker,
};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};

/// Pseudo relations visible in trigger conditions and rule bodies
const ROW_ALIASES: &[&str] = &["new", "old"];

/// What a launcher analyses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LauncherKind {
    ColumnDefault,
    Constraint,
    Index,
    TriggerWhen,
    Rule,
    View,
    /// Function or procedure body
    Routine,
    Operator,
    Aggregate,
}

impl LauncherKind {
    /// Kinds that only copy a return type and must run before everything else
    pub fn is_propagation(&self) -> bool {
        matches!(self, LauncherKind::Operator | LauncherKind::Aggregate)
    }

    pub fn needs_fragment(&self) -> bool {
        !self.is_propagation()
    }
}

impl fmt::Display for LauncherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LauncherKind::ColumnDefault => "column default",
            LauncherKind::Constraint => "constraint",
            LauncherKind::Index => "index",
            LauncherKind::TriggerWhen => "trigger condition",
            LauncherKind::Rule => "rule",
            LauncherKind::View => "view",
            LauncherKind::Routine => "routine body",
            LauncherKind::Operator => "operator",
            LauncherKind::Aggregate => "aggregate",
        };
        f.write_str(label)
    }
}

/// Owner details captured when the launcher is created
#[derive(Debug, Clone)]
struct LaunchContext {
    statement: String,
    dialect: Dialect,
    /// Table whose columns are in scope, as (schema, name)
    table: Option<(String, String)>,
    arguments: Vec<FunctionParameter>,
    implementation: Option<QualifiedName>,
}

/// A queued analysis of one fragment
#[derive(Debug, Clone)]
pub struct AnalysisLauncher {
    owner: StatementId,
    kind: LauncherKind,
    fragment: Option<ParsedFragment>,
    location: SourceSpan,
    context: LaunchContext,
}

impl AnalysisLauncher {
    /// Create a launcher for `fragment`, owned by statement `owner`
    ///
    /// # Errors
    ///
    /// `AnalysisError::UnknownStatement` if `owner` is not in the database and
    /// `AnalysisError::MissingFragment` if the kind needs a fragment and none
    /// was given.
    pub fn for_statement(
        database: &Database,
        owner: StatementId,
        kind: LauncherKind,
        fragment: Option<ParsedFragment>,
    ) -> AnalysisResult<Self> {
        let statement = database
            .statement(owner)
            .ok_or(AnalysisError::UnknownStatement(owner))?;

        if kind.needs_fragment() && fragment.is_none() {
            return Err(AnalysisError::MissingFragment {
                statement: statement.qualified_name(),
            });
        }

        let table = match statement.kind {
            ObjectKind::Table | ObjectKind::View => {
                Some((statement.schema.clone(), statement.name.clone()))
            }
            _ => statement
                .parent
                .and_then(|parent| database.statement(parent))
                .map(|parent| (parent.schema.clone(), parent.name.clone())),
        };

        let location = match &fragment {
            Some(fragment) if !fragment.span.is_synthetic() => fragment.span,
            _ => statement.location,
        };

        Ok(Self {
            owner,
            kind,
            fragment,
            location,
            context: LaunchContext {
                statement: statement.qualified_name(),
                dialect: database.dialect,
                table,
                arguments: statement.arguments.clone(),
                implementation: statement.implementation.clone(),
            },
        })
    }

    pub fn owner(&self) -> StatementId {
        self.owner
    }

    pub fn kind(&self) -> LauncherKind {
        self.kind
    }

    pub fn location(&self) -> SourceSpan {
        self.location
    }

    /// Qualified name of the owning statement
    pub fn statement_name(&self) -> &str {
        &self.context.statement
    }

    /// Owning view as (schema, name), for view launchers only
    pub fn view_name(&self) -> Option<(&str, &str)> {
        match (self.kind, &self.context.table) {
            (LauncherKind::View, Some((schema, name))) => Some((schema, name)),
            _ => None,
        }
    }

    /// Run the analysis against a metadata snapshot
    ///
    /// # Errors
    ///
    /// `AnalysisError::Interrupted` if `cancel` fires before or during the
    /// walk, `AnalysisError::StatementFailed` for structural errors in the
    /// fragment.
    pub fn analyze(
        self,
        snapshot: &dyn MetadataSnapshot,
        config: &AnalysisConfig,
        cancel: &CancellationToken,
    ) -> AnalysisResult<LaunchOutcome> {
        if cancel.is_cancelled() {
            return Err(AnalysisError::Interrupted);
        }

        if self.kind.is_propagation() {
            return Ok(self.propagate_return_type(snapshot));
        }

        let fragment = self
            .fragment
            .as_ref()
            .ok_or_else(|| AnalysisError::MissingFragment {
                statement: self.context.statement.clone(),
            })?;

        debug!(
            statement = %self.context.statement,
            kind = %self.kind,
            "Analysing fragment"
        );

        let dialect = self.context.dialect;
        let walked = match dialect.family() {
            DialectFamily::PostgreSQL => {
                self.walk(PostgresOps::new(dialect), snapshot, config, cancel, fragment)
            }
            DialectFamily::ClickHouse => self.walk(ClickHouseOps, snapshot, config, cancel, fragment),
            DialectFamily::MsSql => self.walk(MsSqlOps, snapshot, config, cancel, fragment),
        };
        let output = walked.map_err(|err| self.failure(err))?;

        let statement = &self.context.statement;
        let diagnostics = output
            .diagnostics
            .into_iter()
            .map(|diagnostic| diagnostic.with_statement(statement.clone()))
            .collect();

        Ok(LaunchOutcome {
            owner: self.owner,
            dependencies: output.dependencies,
            references: output.references,
            diagnostics,
            columns: (self.kind == LauncherKind::View).then_some(output.columns),
            return_type: None,
        })
    }

    fn walk<D: DialectOps>(
        &self,
        ops: D,
        snapshot: &dyn MetadataSnapshot,
        config: &AnalysisConfig,
        cancel: &CancellationToken,
        fragment: &ParsedFragment,
    ) -> SemanticResult<WalkOutput> {
        let mut walker = Walker::new(ops, snapshot)
            .with_cancellation(cancel.clone())
            .with_location(self.location);

        match (self.kind, &self.context.table) {
            (
                LauncherKind::ColumnDefault | LauncherKind::Constraint | LauncherKind::Index,
                Some((schema, name)),
            ) => {
                walker = walker.with_owner_table(schema, name);
            }
            (LauncherKind::TriggerWhen, Some((schema, name))) => {
                walker = walker
                    .with_owner_table(schema, name)
                    .with_pseudo_relations(schema, name, ROW_ALIASES);
            }
            (LauncherKind::Rule, Some((schema, name))) => {
                walker = walker.with_pseudo_relations(schema, name, ROW_ALIASES);
            }
            (LauncherKind::Routine, _) => {
                for (index, argument) in self.context.arguments.iter().enumerate() {
                    let data_type = Some(argument.data_type.clone());
                    walker = walker.with_variable(format!("${}", index + 1), data_type.clone());
                    if let Some(name) = &argument.name {
                        walker = walker.with_variable(name.clone(), data_type);
                    }
                }
                walker = walker.with_disabled_kinds(config.disabled_body_kinds());
            }
            _ => {}
        }

        walker.analyze(fragment)
    }

    fn propagate_return_type(self, snapshot: &dyn MetadataSnapshot) -> LaunchOutcome {
        let return_type = match &self.context.implementation {
            Some(function) => {
                let found = snapshot.find_function(function.schema.as_deref(), &function.name);
                if found.is_none() {
                    debug!(
                        statement = %self.context.statement,
                        function = %function.name,
                        "Implementation function not found"
                    );
                }
                found.and_then(|f| f.return_type)
            }
            None => {
                debug!(statement = %self.context.statement, "No implementation function");
                None
            }
        };

        LaunchOutcome {
            owner: self.owner,
            dependencies: DependencySet::new(),
            references: DependencySet::new(),
            diagnostics: Vec::new(),
            columns: None,
            return_type,
        }
    }

    fn failure(&self, err: SemanticError) -> AnalysisError {
        if err.is_cancelled() {
            return AnalysisError::Interrupted;
        }
        AnalysisError::StatementFailed {
            statement: self.context.statement.clone(),
            location: self.location,
            source: err,
        }
    }
}

/// Result of running one launcher, applied to the database afterwards
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOutcome {
    pub owner: StatementId,
    /// Hard dependencies of the owner
    pub dependencies: DependencySet,
    /// Outline references for the global index
    pub references: DependencySet,
    pub diagnostics: Vec<Diagnostic>,
    /// Inferred output columns, views only
    pub columns: Option<Vec<ColumnMetadata>>,
    /// Propagated return type, operators and aggregates only
    pub return_type: Option<String>,
}

impl LaunchOutcome {
    /// Record the outcome on its owner and in the global reference index
    ///
    /// Returns the diagnostics for the caller to collect.
    pub fn apply(self, database: &mut Database) -> Vec<Diagnostic> {
        let Some(statement) = database.statement_mut(self.owner) else {
            warn!(owner = %self.owner, "Outcome for a statement that no longer exists");
            return self.diagnostics;
        };

        for reference in self.dependencies.iter() {
            statement.add_dependency(reference.clone());
        }
        if let Some(columns) = self.columns {
            statement.set_inferred_columns(columns);
        }
        if self.return_type.is_some() {
            statement.return_type = self.return_type;
        }

        database.merge_references(self.references);
        self.diagnostics
    }
}
