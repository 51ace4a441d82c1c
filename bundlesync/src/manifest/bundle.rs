//! Package bundle records.

use std::fmt;

use serde::Serialize;

/// Stable identity of a bundle within one manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BundleId(pub u32);

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One deployable content bundle.
///
/// Bundles are immutable once they are part of a manifest. Only direct
/// dependency edges are stored; the transitive closure is computed by the
/// manifest when it is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageBundle {
    /// Identity within the owning manifest.
    pub id: BundleId,

    /// Logical bundle name as produced by the packer.
    pub bundle_name: String,

    /// Versioned file name used for remote and build-in lookups.
    pub file_name: String,

    /// Lowercase hex SHA-256 of the bundle bytes.
    pub file_hash: String,

    /// Size of the bundle file in bytes.
    pub file_size: u64,

    /// Content tags. Untagged bundles are mandatory content.
    pub tags: Vec<String>,

    /// Direct dependency edges.
    pub depend_ids: Vec<BundleId>,
}

impl PackageBundle {
    /// Create a bundle whose file name is derived from its name and hash.
    ///
    /// The derived name is `<bundle_name>_<file_hash>.bundle`, which makes the
    /// file name itself a content address.
    pub fn new(
        id: BundleId,
        bundle_name: impl Into<String>,
        file_hash: impl Into<String>,
        file_size: u64,
    ) -> Self {
        let bundle_name = bundle_name.into();
        let file_hash = file_hash.into().to_lowercase();
        let file_name = format!("{}_{}.bundle", bundle_name, file_hash);
        Self {
            id,
            bundle_name,
            file_name,
            file_hash,
            file_size,
            tags: Vec::new(),
            depend_ids: Vec::new(),
        }
    }

    /// Override the derived file name.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Set the content tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the direct dependency edges.
    pub fn with_dependencies(mut self, depend_ids: impl IntoIterator<Item = BundleId>) -> Self {
        self.depend_ids = depend_ids.into_iter().collect();
        self
    }

    /// Returns true if the bundle carries at least one tag.
    pub fn has_any_tags(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Returns true if any of the bundle's tags is in `tags`.
    pub fn has_tag<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter()
            .any(|wanted| self.tags.iter().any(|own| own == wanted.as_ref()))
    }
}

impl fmt::Display for PackageBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.bundle_name, self.file_name)
    }
}
