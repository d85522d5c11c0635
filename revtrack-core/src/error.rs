//! Error types for revtrack-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ServiceName;

/// All errors that can arise from persisted store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure (open, prepare, execute, constraint).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem failure while preparing the database location.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An update addressed a row id that does not exist.
    #[error("no {table} row with id {id}")]
    RowNotFound { table: &'static str, id: i64 },

    /// An insert collided with the one-record-per-service constraint.
    #[error("{table} already holds a record for service '{service}'")]
    Duplicate {
        table: &'static str,
        service: ServiceName,
    },

    /// A stored column could not be decoded into its domain type.
    #[error("corrupt {column} value '{value}'")]
    Corrupt { column: &'static str, value: String },
}

/// Errors from loading `~/.revtrack/config.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error, with the offending file path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
