//! Play-mode service errors.

use thiserror::Error;

use crate::manifest::{InvalidAssetRequestError, ManifestIntegrityError};

/// Result type for play-mode operations.
pub type PlayModeResult<T> = Result<T, PlayModeError>;

/// Errors returned by play-mode services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayModeError {
    /// No manifest was activated for the package yet.
    #[error("no active manifest for package {package_name}")]
    NoActiveManifest { package_name: String },

    /// The active manifest does not know the requested asset or bundle.
    #[error(transparent)]
    Integrity(#[from] ManifestIntegrityError),

    /// The asset descriptor was marked invalid by the caller.
    #[error(transparent)]
    InvalidAsset(#[from] InvalidAssetRequestError),
}
