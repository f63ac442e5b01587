// Copyright (c) 2025 schemadiff contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Analysis Configuration
//!
//! Settings for the full dependency-analysis pass.
//!
//! ## Sources
//!
//! - Defaults: function-body dependencies on, pool sized from the CPU count
//! - Settings payload: `{"schemadiff": {"analysis": {...}}}` with camelCase keys
//! - Environment: `SCHEMADIFF_ANALYSIS_THREADS`, `SCHEMADIFF_FUNCTION_BODY_DEPS`
//!
//! ## Example
//!
//! ```rust
//! use schemadiff_analysis::AnalysisConfig;
//!
//! let settings = serde_json::json!({
//!     "schemadiff": { "analysis": { "workerThreads": 2 } }
//! });
//! let config = AnalysisConfig::from_settings(&settings).unwrap();
//! assert_eq!(config.effective_worker_threads(), 2);
//! assert!(config.enable_function_body_dependencies);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use schemadiff_ir::ObjectKind;

/// Environment variable overriding the worker pool size
pub const THREADS_ENV: &str = "SCHEMADIFF_ANALYSIS_THREADS";

/// Environment variable toggling function-body dependency tracking
pub const FUNCTION_BODY_DEPS_ENV: &str = "SCHEMADIFF_FUNCTION_BODY_DEPS";

/// Configuration of the analysis pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Record dependencies on functions called from routine bodies
    pub enable_function_body_dependencies: bool,

    /// Worker pool size; `None` means one less than the CPU count
    pub worker_threads: Option<usize>,

    /// Carried for the diff stage; analysis does not read it
    pub ignore_privileges: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enable_function_body_dependencies: true,
            worker_threads: None,
            ignore_privileges: false,
        }
    }
}

impl AnalysisConfig {
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn with_function_body_dependencies(mut self, enabled: bool) -> Self {
        self.enable_function_body_dependencies = enabled;
        self
    }

    /// Parse the analysis section of a settings payload.
    ///
    /// Expected shape:
    /// {
    ///   "schemadiff": {
    ///     "analysis": {
    ///       "enableFunctionBodyDependencies": true,
    ///       "workerThreads": 4,
    ///       "ignorePrivileges": false
    ///     }
    ///   }
    /// }
    ///
    /// A payload without the section yields the defaults.
    pub fn from_settings(settings: &Value) -> Result<Self, ConfigError> {
        let Some(section) = settings.get("schemadiff").and_then(|s| s.get("analysis")) else {
            return Ok(Self::default());
        };
        let config: Self = serde_json::from_value(section.clone())
            .map_err(|e| ConfigError::InvalidSettings(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(THREADS_ENV) {
            let threads = value
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidEnvironment {
                    variable: THREADS_ENV,
                    value: value.clone(),
                })?;
            self.worker_threads = Some(threads);
        }
        if let Some(value) = lookup(FUNCTION_BODY_DEPS_ENV) {
            self.enable_function_body_dependencies =
                parse_flag(&value).ok_or_else(|| ConfigError::InvalidEnvironment {
                    variable: FUNCTION_BODY_DEPS_ENV,
                    value: value.clone(),
                })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == Some(0) {
            return Err(ConfigError::InvalidWorkerThreads {
                reason: "worker_threads must be > 0".to_string(),
            });
        }
        Ok(())
    }

    /// Pool size: the configured value, else max(1, cpus - 1)
    pub fn effective_worker_threads(&self) -> usize {
        self.worker_threads
            .unwrap_or_else(|| num_cpus::get().saturating_sub(1))
            .max(1)
    }

    /// Reference kinds left out of routine-body dependency sets
    pub fn disabled_body_kinds(&self) -> Vec<ObjectKind> {
        if self.enable_function_body_dependencies {
            Vec::new()
        } else {
            vec![ObjectKind::Function, ObjectKind::Procedure, ObjectKind::Aggregate]
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Settings payload does not match the expected shape
    #[error("Invalid analysis settings: {0}")]
    InvalidSettings(String),

    /// Environment variable with an unparseable value
    #[error("Invalid value '{value}' for {variable}")]
    InvalidEnvironment { variable: &'static str, value: String },

    #[error("Invalid worker pool configuration: {reason}")]
    InvalidWorkerThreads { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert!(config.enable_function_body_dependencies);
        assert!(config.worker_threads.is_none());
        assert!(config.effective_worker_threads() >= 1);
        assert!(config.disabled_body_kinds().is_empty());
    }

    #[test]
    fn test_from_settings() {
        let settings = json!({
            "schemadiff": {
                "analysis": {
                    "enableFunctionBodyDependencies": false,
                    "workerThreads": 3,
                    "ignorePrivileges": true
                }
            }
        });
        let config = AnalysisConfig::from_settings(&settings).unwrap();
        assert!(!config.enable_function_body_dependencies);
        assert_eq!(config.effective_worker_threads(), 3);
        assert!(config.ignore_privileges);
        assert_eq!(
            config.disabled_body_kinds(),
            vec![ObjectKind::Function, ObjectKind::Procedure, ObjectKind::Aggregate]
        );
    }

    #[test]
    fn test_from_settings_without_section() {
        let config = AnalysisConfig::from_settings(&json!({"other": {}})).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_from_settings_rejects_bad_shape() {
        let settings = json!({"schemadiff": {"analysis": {"workerThreads": "many"}}});
        assert!(matches!(
            AnalysisConfig::from_settings(&settings),
            Err(ConfigError::InvalidSettings(_))
        ));

        let zero = json!({"schemadiff": {"analysis": {"workerThreads": 0}}});
        assert!(matches!(
            AnalysisConfig::from_settings(&zero),
            Err(ConfigError::InvalidWorkerThreads { .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let config = AnalysisConfig::default()
            .with_overrides_from(|name| match name {
                THREADS_ENV => Some("8".to_string()),
                FUNCTION_BODY_DEPS_ENV => Some("off".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.worker_threads, Some(8));
        assert!(!config.enable_function_body_dependencies);

        let err = AnalysisConfig::default()
            .with_overrides_from(|name| (name == THREADS_ENV).then(|| "lots".to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnvironment {
                variable: THREADS_ENV,
                value: "lots".to_string(),
            }
        );
    }
}
