//! JSON manifest file format.
//!
//! ```json
//! {
//!   "package_name": "DefaultPackage",
//!   "package_version": "1.0.0",
//!   "bundles": [
//!     { "id": 0, "bundle_name": "shared", "file_hash": "…", "file_size": 1024 },
//!     { "id": 1, "bundle_name": "hero", "file_hash": "…", "file_size": 2048,
//!       "tags": ["dlc1"], "depends": [0] }
//!   ],
//!   "assets": [
//!     { "path": "Assets/Hero.prefab", "bundle": 1, "depends": [0] }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use bundlesync::manifest::{BundleId, ManifestBuilder, ManifestResult, PackageBundle, PackageManifest};
use serde::Deserialize;

use crate::error::CliError;

/// Top-level manifest document.
#[derive(Debug, Deserialize)]
pub struct ManifestFile {
    pub package_name: String,
    pub package_version: String,
    #[serde(default)]
    pub bundles: Vec<BundleRecord>,
    #[serde(default)]
    pub assets: Vec<AssetRecord>,
}

/// One bundle entry.
#[derive(Debug, Deserialize)]
pub struct BundleRecord {
    pub id: u32,
    pub bundle_name: String,
    pub file_hash: String,
    pub file_size: u64,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub depends: Vec<u32>,
}

/// One asset entry.
#[derive(Debug, Deserialize)]
pub struct AssetRecord {
    pub path: String,
    pub bundle: u32,
    #[serde(default)]
    pub depends: Vec<u32>,
}

impl ManifestFile {
    /// Parse a manifest document.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Build and validate the manifest graph.
    pub fn into_manifest(self) -> ManifestResult<PackageManifest> {
        let mut builder = ManifestBuilder::new(self.package_name, self.package_version);

        for record in self.bundles {
            let mut bundle = PackageBundle::new(
                BundleId(record.id),
                record.bundle_name,
                record.file_hash,
                record.file_size,
            )
            .with_tags(record.tags)
            .with_dependencies(record.depends.into_iter().map(BundleId));
            if let Some(file_name) = record.file_name {
                bundle = bundle.with_file_name(file_name);
            }
            builder = builder.bundle(bundle);
        }

        for asset in self.assets {
            builder = builder.asset_with_dependencies(
                asset.path,
                BundleId(asset.bundle),
                asset.depends.into_iter().map(BundleId),
            );
        }

        builder.build()
    }
}

/// Read, parse and validate a manifest file.
pub fn load_manifest(path: &Path) -> Result<PackageManifest, CliError> {
    let text = fs::read_to_string(path).map_err(|e| CliError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file = ManifestFile::parse(&text).map_err(|e| CliError::ManifestFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(file.into_manifest()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "package_name": "DefaultPackage",
        "package_version": "1.0.0",
        "bundles": [
            { "id": 0, "bundle_name": "shared", "file_hash": "AA11", "file_size": 1024 },
            { "id": 1, "bundle_name": "hero", "file_hash": "bb22", "file_size": 2048,
              "tags": ["dlc1"], "depends": [0] },
            { "id": 2, "bundle_name": "raw", "file_hash": "cc33", "file_size": 1,
              "file_name": "raw.rawfile" }
        ],
        "assets": [
            { "path": "Assets/Hero.prefab", "bundle": 1 }
        ]
    }"#;

    #[test]
    fn test_parse_and_build() {
        let manifest = ManifestFile::parse(SAMPLE).unwrap().into_manifest().unwrap();

        assert_eq!(manifest.package_name(), "DefaultPackage");
        assert_eq!(manifest.bundle_count(), 3);
        assert_eq!(manifest.bundles()[0].file_name, "shared_aa11.bundle");
        assert_eq!(manifest.bundles()[2].file_name, "raw.rawfile");

        let deps = manifest.get_all_dependencies("Assets/Hero.prefab").unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].bundle_name, "shared");
    }

    #[test]
    fn test_dangling_dependency_rejected() {
        let json = r#"{
            "package_name": "p",
            "package_version": "1",
            "bundles": [{ "id": 0, "bundle_name": "a", "file_hash": "00", "file_size": 1, "depends": [7] }]
        }"#;
        let err = ManifestFile::parse(json).unwrap().into_manifest().unwrap_err();
        assert!(err.to_string().contains("#7"));
    }

    #[test]
    fn test_load_manifest_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_manifest(&path), Err(CliError::ManifestFormat { .. })));
        assert!(matches!(
            load_manifest(&dir.path().join("missing.json")),
            Err(CliError::Read { .. })
        ));
    }

    #[test]
    fn test_load_manifest_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(&path, SAMPLE).unwrap();

        let manifest = load_manifest(&path).unwrap();
        assert_eq!(manifest.asset_count(), 1);
    }
}
