//! Asset request descriptors.

use super::error::InvalidAssetRequestError;

/// An asset a caller wants resolved.
///
/// Callers that fail to locate an asset before resolution (bad location
/// string, unknown type) build an invalid descriptor carrying the reason.
/// The resolver skips invalid descriptors with a warning; the bundle services
/// reject them outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    asset_path: String,
    error: Option<String>,
}

impl AssetInfo {
    /// Create a valid asset descriptor.
    pub fn new(asset_path: impl Into<String>) -> Self {
        Self {
            asset_path: asset_path.into(),
            error: None,
        }
    }

    /// Create a descriptor that was marked invalid before resolution.
    pub fn invalid(asset_path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            asset_path: asset_path.into(),
            error: Some(error.into()),
        }
    }

    /// The requested asset path.
    pub fn asset_path(&self) -> &str {
        &self.asset_path
    }

    /// Returns true if the descriptor was marked invalid.
    pub fn is_invalid(&self) -> bool {
        self.error.is_some()
    }

    /// The reason the descriptor is invalid, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns the asset path, or the request error for invalid descriptors.
    pub fn validate(&self) -> Result<&str, InvalidAssetRequestError> {
        match &self.error {
            None => Ok(&self.asset_path),
            Some(reason) => Err(InvalidAssetRequestError {
                asset_path: self.asset_path.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

impl From<&str> for AssetInfo {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for AssetInfo {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}
