//! Error types for each subsystem.

use thiserror::Error;

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the auth service lookup performed by the session gate.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("auth service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("auth service returned status {0}")]
    Status(u16),
}

/// Errors from fetching chat history pages.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("chat history request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("chat history request returned status {0}")]
    Status(u16),
}

/// Errors from the key-value store backing the local chat cache.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
