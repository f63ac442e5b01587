// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Error types for the analysis pass
//!
//! A failing statement is recoverable: it becomes a diagnostic and the pass
//! continues. Interruption and task infrastructure failures end the pass.

use schemadiff_ir::SourceSpan;
use schemadiff_schema::StatementId;
use schemadiff_semantic::SemanticError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors raised by launchers and the full pass
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// One statement could not be analysed; it is left out of the graph
    #[error("Analysis of {statement} failed at {location}: {source}")]
    StatementFailed {
        statement: String,
        location: SourceSpan,
        #[source]
        source: SemanticError,
    },

    /// A launcher that needs a parsed fragment was queued without one
    #[error("No parsed fragment for {statement}")]
    MissingFragment { statement: String },

    /// A launcher names a statement that is not in the database
    #[error("Unknown statement {0}")]
    UnknownStatement(StatementId),

    /// Cancellation was requested
    #[error("Analysis interrupted")]
    Interrupted,

    /// The worker pool failed
    #[error("Task infrastructure failure: {0}")]
    Task(TaskError),

    #[error("Invalid analysis configuration: {0}")]
    Config(#[from] ConfigError),
}

impl AnalysisError {
    /// Whether the error ends the whole pass rather than one statement
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AnalysisError::Interrupted | AnalysisError::Task(_) | AnalysisError::Config(_)
        )
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, AnalysisError::Interrupted)
    }
}

impl From<TaskError> for AnalysisError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::Cancelled => AnalysisError::Interrupted,
            other => AnalysisError::Task(other),
        }
    }
}

/// Errors raised by the task manager
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The task was not started because cancellation was requested
    #[error("Task cancelled")]
    Cancelled,

    /// The task panicked on a worker thread
    #[error("Worker panicked: {0}")]
    WorkerPanicked(String),

    /// The worker dropped the result channel without sending
    #[error("Worker disconnected before sending a result")]
    Disconnected,

    #[error("Failed to build worker pool: {0}")]
    PoolBuild(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_task_becomes_interruption() {
        let err: AnalysisError = TaskError::Cancelled.into();
        assert!(err.is_interrupted());
        assert!(err.is_fatal());

        let err: AnalysisError = TaskError::WorkerPanicked("boom".to_string()).into();
        assert!(matches!(err, AnalysisError::Task(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_statement_failure_is_recoverable() {
        let err = AnalysisError::StatementFailed {
            statement: "public.v".to_string(),
            location: SourceSpan::new(0, 4, 3, 1),
            source: SemanticError::UnsupportedNode {
                kind: "XMLTABLE".to_string(),
                location: SourceSpan::new(20, 8, 3, 21),
            },
        };
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Analysis of public.v failed at 3:1: Unsupported XMLTABLE at 3:21"
        );
    }
}
