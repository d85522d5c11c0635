//! Error types for revtrack-replication.

use thiserror::Error;

/// Failure fetching or decoding one page of the status feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Transport failure or a non-2xx response.
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// The body was not a JSON array of status records.
    #[error("invalid status page from {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// Reading the response body failed mid-stream.
    #[error("I/O error reading {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(origin: impl Into<String>, source: std::io::Error) -> FeedError {
    FeedError::Io {
        origin: origin.into(),
        source,
    }
}
