//! CLI error type.

use std::io;
use std::path::PathBuf;

use bundlesync::logging::LoggingError;
use bundlesync::manifest::ManifestIntegrityError;
use bundlesync::operation::OperationError;
use bundlesync::playmode::PlayModeError;
use bundlesync::transfer::TransferError;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The manifest file is not valid JSON for a manifest.
    #[error("invalid manifest file {}: {reason}", .path.display())]
    ManifestFormat { path: PathBuf, reason: String },

    /// The manifest graph is not closed.
    #[error("manifest rejected: {0}")]
    Manifest(#[from] ManifestIntegrityError),

    #[error(transparent)]
    PlayMode(#[from] PlayModeError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The download operation failed.
    #[error("download failed: {0}")]
    Operation(#[from] OperationError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// The tokio runtime could not start.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),

    /// Output could not be encoded.
    #[error("failed to encode output: {0}")]
    Output(String),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_transfer_error_passes_through() {
        let err: CliError = TransferError::Timeout {
            url: "http://cdn/a.bundle".into(),
            timeout: Duration::from_millis(500),
        }
        .into();
        assert_eq!(err.to_string(), "fetching http://cdn/a.bundle timed out after 500ms");
    }

    #[test]
    fn test_read_error_names_path() {
        let err = CliError::Read {
            path: PathBuf::from("/tmp/manifest.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "failed to read /tmp/manifest.json: missing");
    }
}
