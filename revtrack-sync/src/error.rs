//! Error types for revtrack-sync.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use revtrack_core::{ServiceName, StoreError};

/// Fatal errors: the run aborts and produces no output.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The change-log stream could not be opened or read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A store read the run depends on failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A promotion argument was not `environment:service:tag`.
    #[error("invalid promotion '{input}': {reason}")]
    InvalidPromotion { input: String, reason: String },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Which single-record write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreOperation {
    Lookup,
    Insert,
    Update,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreOperation::Lookup => write!(f, "lookup"),
            StoreOperation::Insert => write!(f, "insert"),
            StoreOperation::Update => write!(f, "update"),
        }
    }
}

/// A best-effort per-record failure. The run continues; the next run
/// re-detects the same difference because the record was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreWarning {
    pub service: ServiceName,
    pub operation: StoreOperation,
    pub message: String,
}

impl StoreWarning {
    /// Build the warning and log it.
    pub(crate) fn record(service: &ServiceName, operation: StoreOperation, err: &StoreError) -> Self {
        tracing::warn!("{operation} failed for '{service}': {err}");
        Self {
            service: service.clone(),
            operation,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for StoreWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.service, self.operation, self.message)
    }
}
