//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// `run` called after `wait`
    #[error("dispatcher already waited; job '{job}' rejected")]
    Spent { job: String },

    /// A previous `wait` failed to drain the backend
    #[error("dispatcher drain already failed: {reason}")]
    DrainFailed { reason: String },

    /// Configuration, launch or execution error (from contract)
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a spent-dispatcher error
    pub fn spent(job: impl Into<String>) -> Self {
        Self::Spent { job: job.into() }
    }

    /// Create an error repeating an earlier drain failure
    pub fn drain_failed(reason: impl Into<String>) -> Self {
        Self::DrainFailed {
            reason: reason.into(),
        }
    }

    /// Whether the error was raised before any job reached a backend
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Contract(e) if e.is_configuration())
    }
}
