// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Summary of one full analysis pass

use serde::Serialize;

use schemadiff_semantic::{Diagnostic, Severity};

/// Counts and diagnostics returned by [`FullAnalysis::run`](crate::FullAnalysis::run)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Launchers whose outcome was applied
    pub analysed: usize,
    /// Launchers excluded from the graph after a structural error
    pub failed: usize,
    /// Diagnostics in the order they were produced
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisReport {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.failed > 0 || self.errors().next().is_some()
    }

    /// No failures and no diagnostics of any severity
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.diagnostics.is_empty()
    }

    pub(crate) fn absorb(&mut self, diagnostics: Vec<Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }
}
