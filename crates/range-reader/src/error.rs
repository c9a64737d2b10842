//! Error types for range sources and the buffered reader.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure reported by a [`RangeSource`](crate::RangeSource).
#[derive(Error, Debug)]
pub enum FetchError {
    /// The object's last-modified timestamp no longer matches the precondition
    #[error("precondition failed: object modified")]
    PreconditionFailed,

    /// Any other failure (network, permission, not found, ...)
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

/// Errors surfaced by [`RangeReader`](crate::RangeReader).
#[derive(Error, Debug)]
pub enum ReadError {
    /// The object changed after the reader captured its baseline timestamp
    #[error("object '{key}' was modified after {observed} while reading")]
    Modified {
        key: String,
        observed: DateTime<Utc>,
    },

    /// Source failure other than a precondition mismatch
    #[error("failed to read '{key}': {source:#}")]
    Source {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ReadError {
    /// True if this error is the read-after-modify condition
    pub fn is_modified(&self) -> bool {
        matches!(self, ReadError::Modified { .. })
    }
}

impl From<ReadError> for std::io::Error {
    fn from(err: ReadError) -> Self {
        std::io::Error::other(err)
    }
}
