//! Unified error types for the application
//!
//! Maps internal failures onto the error taxonomy surfaced to callers:
//! invalid input, missing entities, and the two storage failure classes
//! (session-fatal unavailability vs. per-query errors). A missing FTS
//! index is not represented here — search recovers from it locally.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application error type for CLI commands and the store.
///
/// All errors are serializable so structured consumers see the same
/// taxonomy as the exit path.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BeelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("Database unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<rusqlite::Error> for BeelineError {
    fn from(err: rusqlite::Error) -> Self {
        BeelineError::Query(err.to_string())
    }
}

impl From<r2d2::Error> for BeelineError {
    fn from(err: r2d2::Error) -> Self {
        BeelineError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for BeelineError {
    fn from(err: serde_json::Error) -> Self {
        BeelineError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for BeelineError {
    fn from(err: std::io::Error) -> Self {
        BeelineError::Io(err.to_string())
    }
}

/// Result type alias using BeelineError
pub type Result<T> = std::result::Result<T, BeelineError>;
