//! Error type for the fallible edges of the chart engine.
//!
//! Numeric edge cases inside the engine never fail; only settings I/O,
//! feed plumbing and background tasks return errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to get config directory")]
    ConfigDirUnavailable,

    #[error("bar feed closed")]
    FeedClosed,

    #[error("background task failed: {0}")]
    Task(String),

    #[error("logger init failed: {0}")]
    Logger(String),
}

pub type Result<T> = std::result::Result<T, ChartError>;
