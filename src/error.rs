//! Error handling module for wok platforms
//!
//! Provides centralized error types using thiserror. Configuration errors are
//! fatal and abort platform construction. Submission errors are scoped to a
//! single task and never abort a batch. Transport failures are not errors at
//! all: they are logged and reported as a [`SyncOutcome`](crate::sync::SyncOutcome).

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a platform from configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more required keys are absent
    #[error("Missing configuration fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// The transfer URL uses a scheme no transport understands
    #[error("Unsupported transfer scheme: {0}")]
    UnsupportedScheme(String),

    /// The transfer URL could not be parsed at all
    #[error("Invalid transfer url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A key is present but its value has the wrong shape
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// Configuration file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create a missing-field error for a single key
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingFields(vec![key.into()])
    }

    /// Create an invalid-value error
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that prevent a single task from getting a job submission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// The task's flow does not live under its project's root
    #[error("Flow path {} is outside project root {}", flow_path.display(), project_path.display())]
    OutsideProject {
        flow_path: PathBuf,
        project_path: PathBuf,
    },

    /// The flow loader did not record an environment key the builder needs
    #[error("Task '{task}' has no '{key}' environment entry")]
    MissingEnv { task: String, key: String },

    /// The flow path has no parent directory
    #[error("Flow path {} has no parent directory", flow_path.display())]
    MissingFlowDir { flow_path: PathBuf },

    /// The recorded script path is empty, absolute or climbs out with `..`
    #[error("Task '{task}' has script path '{}', expected a relative path below the flow directory", path.display())]
    InvalidScriptPath { task: String, path: PathBuf },

    /// The project name cannot be used as a single directory name
    #[error("Project name '{name}' is not a valid directory name")]
    InvalidProjectName { name: String },
}

/// Main error type for platform operations
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Configuration errors (loading, missing keys, bad schemes)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Per-task submission errors
    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// Lifecycle errors (using a stopped platform, etc.)
    #[error("State error: {0}")]
    State(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

impl PlatformError {
    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_display() {
        let err = ConfigError::MissingFields(vec!["files_url".into(), "work_path".into()]);
        assert_eq!(
            err.to_string(),
            "Missing configuration fields: files_url, work_path"
        );
    }

    #[test]
    fn test_config_error_converts_to_platform_error() {
        let err: PlatformError = ConfigError::UnsupportedScheme("ftp".into()).into();
        assert!(matches!(err, PlatformError::Config(_)));
        assert_eq!(
            err.to_string(),
            "Configuration error: Unsupported transfer scheme: ftp"
        );
    }

    #[test]
    fn test_outside_project_display() {
        let err = SubmissionError::OutsideProject {
            flow_path: PathBuf::from("/elsewhere/flow.wok"),
            project_path: PathBuf::from("/projects/p1"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/elsewhere/flow.wok"));
        assert!(msg.contains("/projects/p1"));
    }
}
