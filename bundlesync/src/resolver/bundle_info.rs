//! Resolved units of work.

use std::sync::Arc;

use serde::Serialize;

use crate::manifest::PackageBundle;

/// Where a bundle is loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LoadMode {
    /// Bundle ships with the application.
    FromLocal,
    /// Bundle must be fetched.
    FromRemote,
}

/// Source addresses for a bundle.
///
/// Remote sources always carry both URLs so a transport can fall back
/// without re-resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BundleSource {
    /// Available locally.
    Local,
    /// Fetched from a primary URL with a fallback.
    Remote {
        main_url: String,
        fallback_url: String,
    },
}

/// One resolved bundle.
///
/// Built per resolution call and handed straight to an orchestrator; never
/// cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleInfo {
    /// The manifest bundle this entry was resolved from.
    pub bundle: Arc<PackageBundle>,
    /// Load location.
    pub source: BundleSource,
}

/// Download-list entries are bundle infos with a remote source.
pub type FetchDescriptor = BundleInfo;

impl BundleInfo {
    /// A locally available bundle.
    pub fn local(bundle: Arc<PackageBundle>) -> Self {
        Self {
            bundle,
            source: BundleSource::Local,
        }
    }

    /// A bundle fetched from `main_url`, falling back to `fallback_url`.
    pub fn remote(
        bundle: Arc<PackageBundle>,
        main_url: impl Into<String>,
        fallback_url: impl Into<String>,
    ) -> Self {
        Self {
            bundle,
            source: BundleSource::Remote {
                main_url: main_url.into(),
                fallback_url: fallback_url.into(),
            },
        }
    }

    /// The load mode tag.
    pub fn load_mode(&self) -> LoadMode {
        match self.source {
            BundleSource::Local => LoadMode::FromLocal,
            BundleSource::Remote { .. } => LoadMode::FromRemote,
        }
    }

    /// Primary URL, for remote entries.
    pub fn main_url(&self) -> Option<&str> {
        match &self.source {
            BundleSource::Remote { main_url, .. } => Some(main_url),
            BundleSource::Local => None,
        }
    }

    /// Fallback URL, for remote entries.
    pub fn fallback_url(&self) -> Option<&str> {
        match &self.source {
            BundleSource::Remote { fallback_url, .. } => Some(fallback_url),
            BundleSource::Local => None,
        }
    }

    /// The URL to use for a given attempt (0-based).
    ///
    /// Even attempts use the primary URL, odd attempts the fallback. Local
    /// entries have no URL and yield the bundle's file name.
    pub fn url_for_attempt(&self, attempt: u32) -> &str {
        match &self.source {
            BundleSource::Remote { main_url, .. } if attempt % 2 == 0 => main_url,
            BundleSource::Remote { fallback_url, .. } => fallback_url,
            BundleSource::Local => &self.bundle.file_name,
        }
    }
}
