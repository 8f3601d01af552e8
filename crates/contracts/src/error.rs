//! Layered error definitions
//!
//! Categorized by when they surface: configuration (before any job is
//! launched), launch (a backend refused the submission) and job execution
//! (only observable for the local backend).

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// A required executable could not be found
    #[error("executable '{name}' not found (searched: {searched:?})")]
    MissingExecutable { name: String, searched: Vec<PathBuf> },

    /// A required input path does not exist
    #[error("required input does not exist: {}", path.display())]
    MissingInput { path: PathBuf },

    // ===== Launch Errors =====
    /// Backend refused to spawn or accept a job
    #[error("{backend} backend failed to launch: {message}")]
    Launch { backend: String, message: String },

    // ===== Execution Errors =====
    /// Job finished unsuccessfully (local backend only)
    #[error("job '{job}' failed: {status}")]
    JobExecution { job: String, status: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create missing executable error
    pub fn missing_executable(name: impl Into<String>, searched: Vec<PathBuf>) -> Self {
        Self::MissingExecutable {
            name: name.into(),
            searched,
        }
    }

    /// Create missing input error
    pub fn missing_input(path: impl Into<PathBuf>) -> Self {
        Self::MissingInput { path: path.into() }
    }

    /// Create launch error
    pub fn launch(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Launch {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create job execution error
    pub fn job_execution(job: impl Into<String>, status: impl Into<String>) -> Self {
        Self::JobExecution {
            job: job.into(),
            status: status.into(),
        }
    }

    /// Whether this error belongs to the configuration class, i.e. it is
    /// raised before any job reaches a backend.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. }
                | Self::ConfigValidation { .. }
                | Self::MissingExecutable { .. }
                | Self::MissingInput { .. }
        )
    }
}
