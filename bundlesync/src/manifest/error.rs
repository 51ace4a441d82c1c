//! Manifest error types.

use thiserror::Error;

use super::bundle::BundleId;

/// Result type for manifest lookups.
pub type ManifestResult<T> = Result<T, ManifestIntegrityError>;

/// A manifest lookup or construction found the graph not internally closed.
///
/// A well-formed manifest always resolves every asset and bundle it names, so
/// these are treated as data or build bugs and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestIntegrityError {
    /// The asset path is not indexed by the manifest.
    #[error("asset not found in manifest: {path}")]
    MissingAsset { path: String },

    /// The bundle id is not part of the manifest.
    #[error("bundle {id} not found in manifest")]
    MissingBundle { id: BundleId },

    /// A bundle or asset references a bundle that is not in the manifest.
    #[error("{owner} depends on bundle {dependency} which is not in the manifest")]
    DanglingDependency { owner: String, dependency: BundleId },

    /// Two bundles share an id.
    #[error("duplicate bundle id {id}")]
    DuplicateBundle { id: BundleId },

    /// An asset path was registered twice.
    #[error("duplicate asset path: {path}")]
    DuplicateAsset { path: String },
}

/// The caller supplied an asset descriptor that was already marked invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid asset request {asset_path}: {reason}")]
pub struct InvalidAssetRequestError {
    /// Path of the rejected asset.
    pub asset_path: String,
    /// Reason recorded when the descriptor was built.
    pub reason: String,
}
