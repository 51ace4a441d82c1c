//! Error types for bundle transfers.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors that can occur while fetching bundles.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The transport reported a failure.
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// A single attempt exceeded its deadline.
    #[error("fetching {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// Downloaded bytes do not hash to the bundle's content address.
    #[error("checksum mismatch for {file_name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file_name: String,
        expected: String,
        actual: String,
    },

    /// Downloaded byte count differs from the manifest.
    #[error("size mismatch for {file_name}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        file_name: String,
        expected: u64,
        actual: u64,
    },

    /// The operation was cancelled by its owner.
    #[error("user cancelled")]
    Cancelled,

    /// Failed to read or write the cache directory.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

impl TransferError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if retrying the same bundle may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::Client(_))
    }
}
