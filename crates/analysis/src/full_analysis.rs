// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Full analysis
//!
//! Runs every queued launcher of a [`LoadedDatabase`] and applies the results.
//!
//! ## Phases
//!
//! 1. **Propagation**: operator and aggregate launchers copy the return type of
//!    their implementation function. Nothing else is submitted before this
//!    phase is complete.
//! 2. **Views**: every view launcher runs once on the calling thread. A view
//!    query that reads another view whose columns are not known yet analyses
//!    that view first, on demand. A launcher's slot is emptied before it runs,
//!    so a view reaching itself sees its own columns as not yet available.
//! 3. **Everything else**: the remaining launchers run on the worker pool
//!    against a snapshot taken after phase 2. Results are applied in
//!    submission order, which makes the outcome independent of the pool size.
//!
//! A launcher that fails with a structural error is left out of the graph and
//! reported as an error diagnostic; the pass continues. Cancellation and
//! worker failures end the pass with an error, leaving the results applied so
//! far in place.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use schemadiff_catalog::{
    FunctionMetadata, MetadataSnapshot, OperatorMetadata, RelationMetadata, StaticCatalog,
    TypeMetadata,
};
use schemadiff_ir::SourceSpan;
use schemadiff_schema::{Database, StatementId};
use schemadiff_semantic::{Diagnostic, DiagnosticCode};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::launcher::{AnalysisLauncher, LaunchOutcome, LauncherKind};
use crate::loaded::LoadedDatabase;
use crate::report::AnalysisReport;
use crate::task_manager::{TaskManager, TaskQueue};

/// Orchestrates one complete dependency analysis
pub struct FullAnalysis<'a> {
    loaded: &'a mut LoadedDatabase,
    config: AnalysisConfig,
    cancel: CancellationToken,
    report: AnalysisReport,
}

impl<'a> FullAnalysis<'a> {
    pub fn new(loaded: &'a mut LoadedDatabase, config: AnalysisConfig) -> Self {
        Self {
            loaded,
            config,
            cancel: CancellationToken::new(),
            report: AnalysisReport::default(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Diagnostics and counts collected so far
    pub fn report(&self) -> &AnalysisReport {
        &self.report
    }

    /// Run all three phases and return the report
    ///
    /// # Errors
    ///
    /// `AnalysisError::Config` for an invalid configuration,
    /// `AnalysisError::Interrupted` on cancellation and `AnalysisError::Task`
    /// when a worker fails. Pending launchers are released in every case.
    pub fn run(mut self) -> AnalysisResult<AnalysisReport> {
        let result = self.run_phases();
        self.loaded.clear();
        if let Err(err) = result {
            error!(error = %err, analysed = self.report.analysed, "Full analysis aborted");
            return Err(err);
        }

        info!(
            analysed = self.report.analysed,
            failed = self.report.failed,
            diagnostics = self.report.diagnostics.len(),
            references = self.loaded.database.references().len(),
            "Full analysis complete"
        );
        Ok(self.report)
    }

    fn run_phases(&mut self) -> AnalysisResult<()> {
        self.config.validate()?;
        info!(
            statements = self.loaded.database.len(),
            launchers = self.loaded.pending(),
            "Starting full analysis"
        );
        self.propagate_return_types()?;
        self.analyze_view(None)?;
        self.analyze_remaining()
    }

    /// Run pending view launchers
    ///
    /// `None` runs every pending view; `Some(id)` only the launcher owning view
    /// `id`. Views read by the ones being analysed are analysed on demand
    /// either way.
    pub fn analyze_view(&mut self, target: Option<StatementId>) -> AnalysisResult<()> {
        let (database, slots) = self.loaded.parts_mut();

        let mut views = HashMap::new();
        let mut order = Vec::new();
        for (index, launcher) in slots.iter().enumerate() {
            let Some(launcher) = launcher else { continue };
            let Some((schema, name)) = launcher.view_name() else {
                continue;
            };
            views.entry(view_key(schema, name)).or_insert(index);
            if target.map_or(true, |id| launcher.owner() == id) {
                order.push(index);
            }
        }
        if order.is_empty() {
            debug!(?target, "No pending view launchers");
            return Ok(());
        }
        info!(views = order.len(), "Analysing views");

        let provider = OnDemandViews {
            default_schema: database.default_schema.clone(),
            catalog: RefCell::new(database.snapshot()),
            pass: RefCell::new(ViewPass {
                slots,
                database,
                report: &mut self.report,
            }),
            views,
            config: &self.config,
            cancel: &self.cancel,
            fatal: RefCell::new(None),
        };

        for index in order {
            provider.run_slot(index);
            if let Some(err) = provider.fatal.borrow_mut().take() {
                return Err(err);
            }
        }
        Ok(())
    }

    fn propagate_return_types(&mut self) -> AnalysisResult<()> {
        let (database, slots) = self.loaded.parts_mut();
        let snapshot = database.snapshot();

        let mut propagated = 0;
        for slot in slots.iter_mut() {
            if !slot.as_ref().is_some_and(|l| l.kind().is_propagation()) {
                continue;
            }
            let Some(launcher) = slot.take() else { continue };
            let result = launcher.analyze(&snapshot, &self.config, &self.cancel);
            record_outcome(database, &mut self.report, result)?;
            propagated += 1;
        }
        debug!(propagated, "Propagated operator and aggregate return types");
        Ok(())
    }

    fn analyze_remaining(&mut self) -> AnalysisResult<()> {
        let (database, slots) = self.loaded.parts_mut();
        let snapshot = Arc::new(database.snapshot());
        let manager = TaskManager::new(self.config.effective_worker_threads())?
            .with_cancellation(self.cancel.clone());

        let mut queue = TaskQueue::new();
        for slot in slots.iter_mut() {
            let Some(launcher) = slot.take() else { continue };
            let snapshot = Arc::clone(&snapshot);
            let config = self.config.clone();
            let cancel = self.cancel.clone();
            manager.submit_with_finalizer(
                &mut queue,
                move || launcher.analyze(&*snapshot, &config, &cancel),
                finalize,
            );
        }
        info!(
            tasks = queue.len(),
            threads = manager.threads(),
            "Submitted launchers to worker pool"
        );

        let mut state = PassState {
            database,
            report: &mut self.report,
            fatal: None,
        };
        let drained = manager.finish(queue, &mut state);
        if let Some(err) = state.fatal {
            return Err(err);
        }
        let drained = drained?;
        debug!(drained, "Worker pool drained");
        Ok(())
    }
}

/// State the pool finalizers write to
struct PassState<'s> {
    database: &'s mut Database,
    report: &'s mut AnalysisReport,
    fatal: Option<AnalysisError>,
}

fn finalize(result: AnalysisResult<LaunchOutcome>, state: &mut PassState<'_>) {
    if let Err(err) = record_outcome(state.database, state.report, result) {
        if state.fatal.is_none() {
            state.fatal = Some(err);
        }
    }
}

/// Apply a launcher result, turning recoverable failures into diagnostics
fn record_outcome(
    database: &mut Database,
    report: &mut AnalysisReport,
    result: AnalysisResult<LaunchOutcome>,
) -> AnalysisResult<()> {
    let err = match result {
        Ok(outcome) => {
            let diagnostics = outcome.apply(database);
            report.absorb(diagnostics);
            report.analysed += 1;
            return Ok(());
        }
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => err,
    };

    let (statement, location) = match &err {
        AnalysisError::StatementFailed {
            statement,
            location,
            ..
        } => (Some(statement.clone()), *location),
        AnalysisError::MissingFragment { statement } => {
            (Some(statement.clone()), SourceSpan::synthetic())
        }
        _ => (None, SourceSpan::synthetic()),
    };
    error!(
        statement = statement.as_deref().unwrap_or("<unknown>"),
        %location,
        error = %err,
        "Statement excluded from dependency graph"
    );

    let mut diagnostic =
        Diagnostic::error(err.to_string(), location).with_code(DiagnosticCode::AnalysisFailed);
    if let Some(statement) = statement {
        diagnostic = diagnostic.with_statement(statement);
    }
    report.failed += 1;
    report.diagnostics.push(diagnostic);
    Ok(())
}

fn view_key(schema: &str, name: &str) -> (String, String) {
    (schema.to_lowercase(), name.to_lowercase())
}

struct ViewPass<'p> {
    slots: &'p mut Vec<Option<AnalysisLauncher>>,
    database: &'p mut Database,
    report: &'p mut AnalysisReport,
}

/// Snapshot that analyses pending views the first time they are looked up
///
/// Confined to the calling thread. No `RefCell` borrow is held while a
/// launcher runs, so lookups may nest.
struct OnDemandViews<'p> {
    default_schema: String,
    catalog: RefCell<StaticCatalog>,
    pass: RefCell<ViewPass<'p>>,
    /// Lower-cased (schema, name) of each view to its launcher slot
    views: HashMap<(String, String), usize>,
    config: &'p AnalysisConfig,
    cancel: &'p CancellationToken,
    fatal: RefCell<Option<AnalysisError>>,
}

impl OnDemandViews<'_> {
    fn run_slot(&self, index: usize) {
        if self.fatal.borrow().is_some() {
            return;
        }
        let Some(launcher) = self
            .pass
            .borrow_mut()
            .slots
            .get_mut(index)
            .and_then(Option::take)
        else {
            return;
        };
        debug_assert_eq!(launcher.kind(), LauncherKind::View);

        let view = launcher
            .view_name()
            .map(|(schema, name)| (schema.to_string(), name.to_string()));
        debug!(statement = %launcher.statement_name(), "Analysing view");
        let result = launcher.analyze(self, self.config, self.cancel);

        if let (Ok(outcome), Some((schema, name))) = (&result, &view) {
            if let Some(columns) = &outcome.columns {
                self.catalog
                    .borrow_mut()
                    .set_columns(schema, name, columns.clone());
            }
        }

        let mut pass = self.pass.borrow_mut();
        let pass = &mut *pass;
        if let Err(err) = record_outcome(&mut *pass.database, &mut *pass.report, result) {
            let mut fatal = self.fatal.borrow_mut();
            if fatal.is_none() {
                *fatal = Some(err);
            }
        }
    }

    /// Analyse the view behind a lookup if its launcher is still pending
    fn ensure_analysed(&self, schema: Option<&str>, name: &str) {
        let resolved = self.catalog.borrow().find_relation(schema, name);
        let Some(relation) = resolved else { return };
        let Some(&index) = self.views.get(&view_key(&relation.schema, &relation.name)) else {
            return;
        };
        let pending = self
            .pass
            .borrow()
            .slots
            .get(index)
            .is_some_and(Option::is_some);
        if pending {
            debug!(
                view = %format!("{}.{}", relation.schema, relation.name),
                "Analysing view on demand"
            );
            self.run_slot(index);
        }
    }
}

impl MetadataSnapshot for OnDemandViews<'_> {
    fn default_schema(&self) -> &str {
        &self.default_schema
    }

    fn find_relation(&self, schema: Option<&str>, name: &str) -> Option<RelationMetadata> {
        self.ensure_analysed(schema, name);
        self.catalog.borrow().find_relation(schema, name)
    }

    fn find_function(&self, schema: Option<&str>, name: &str) -> Option<FunctionMetadata> {
        self.catalog.borrow().find_function(schema, name)
    }

    fn find_operator(&self, schema: Option<&str>, name: &str) -> Option<OperatorMetadata> {
        self.catalog.borrow().find_operator(schema, name)
    }

    fn find_type(&self, schema: Option<&str>, name: &str) -> Option<TypeMetadata> {
        self.catalog.borrow().find_type(schema, name)
    }
}
