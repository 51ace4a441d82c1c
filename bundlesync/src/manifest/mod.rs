//! Package manifest graph.
//!
//! A [`PackageManifest`] is an immutable snapshot of every bundle that makes
//! up one package version, plus the index from asset path to the bundle that
//! owns it and the bundles it transitively depends on.
//!
//! # Type Hierarchy
//!
//! ```text
//! PackageManifest (snapshot, replaced wholesale on update)
//! ├── bundles: [Arc<PackageBundle>]     declaration order
//! │       ├── id / bundle_name / file_name
//! │       ├── file_hash / file_size     content address
//! │       ├── tags                      optional-content partition
//! │       └── depend_ids                direct edges only
//! └── assets: path → (main bundle, transitive dependency bundles)
//! ```
//!
//! Manifests are built through [`ManifestBuilder`], which rejects anything
//! that would leave the graph open (unknown bundle ids, duplicate ids or
//! paths). Lookups on a built manifest therefore treat a miss as an
//! integrity failure, not a soft "not found".
//!
//! # Example
//!
//! ```
//! use bundlesync::manifest::{BundleId, ManifestBuilder, PackageBundle};
//!
//! let manifest = ManifestBuilder::new("DefaultPackage", "1.0.0")
//!     .bundle(PackageBundle::new(BundleId(0), "shared", "aa11", 1024))
//!     .bundle(PackageBundle::new(BundleId(1), "hero", "bb22", 2048).with_dependencies([BundleId(0)]))
//!     .asset("Assets/Hero.prefab", BundleId(1))
//!     .build()
//!     .unwrap();
//!
//! let deps = manifest.get_all_dependencies("Assets/Hero.prefab").unwrap();
//! assert_eq!(deps.len(), 1);
//! assert_eq!(deps[0].bundle_name, "shared");
//! ```

mod asset;
mod bundle;
mod error;
mod graph;

pub use asset::AssetInfo;
pub use bundle::{BundleId, PackageBundle};
pub use error::{InvalidAssetRequestError, ManifestIntegrityError, ManifestResult};
pub use graph::{ManifestBuilder, PackageManifest};
