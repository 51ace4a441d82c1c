//! Download-set resolution.
//!
//! The resolver walks a [`PackageManifest`](crate::manifest::PackageManifest)
//! and produces the list of bundles that still have to be fetched:
//!
//! ```text
//! requested assets / tags / everything
//!         │
//!         ▼
//! manifest closure (main + transitive deps, dedup by id)
//!         │
//!         ▼
//! LocalityClassifier ──► build-in bundles dropped
//!         │
//!         ▼
//! RemoteServices ──► BundleInfo { main_url, fallback_url }
//! ```
//!
//! Resolution is a pure function of the manifest snapshot, the request and
//! the classifier state, so calling it twice yields the same ordered list.

mod bundle_info;
mod download_list;
mod locality;

pub use bundle_info::{BundleInfo, BundleSource, FetchDescriptor, LoadMode};
pub use download_list::DownloadListResolver;
pub use locality::LocalityClassifier;
