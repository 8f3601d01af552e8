//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Loading or validating the configuration failed
    #[error(transparent)]
    Config(#[from] contracts::ContractError),

    /// A command-line value that cannot be applied
    #[error("Invalid argument {flag}: {message}")]
    InvalidArgument { flag: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_argument(flag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            flag: flag.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
