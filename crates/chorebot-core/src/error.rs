//! Error types for chorebot-core.
//!
//! Ledger errors are user-facing conditions: none is retried and none is
//! fatal. Configuration errors only matter at bootstrap.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the task ledger.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Task registration referenced a type outside the known table.
    #[error("Unknown task type '{task_type}' (known: {})", .known.join(", "))]
    UnknownTaskType {
        task_type: String,
        known: Vec<String>,
    },

    /// No task was registered today for this member.
    #[error("No task registered today")]
    NoTaskToday,

    /// Today's task is already marked as done.
    #[error("Task already marked as done")]
    AlreadyDone,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}
