//! Web play mode.
//!
//! Every bundle that does not ship with the application is fetched from the
//! remote hosts. Unpacking and importing have nothing to do in this mode, so
//! those operations complete immediately.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::error::{PlayModeError, PlayModeResult};
use crate::manifest::{AssetInfo, BundleId, PackageManifest};
use crate::resolver::{BundleInfo, DownloadListResolver, LocalityClassifier};
use crate::services::{BuildinQueryServices, RemoteServices};
use crate::transfer::{DownloaderConfig, TransferKind, TransferOperation};

/// Play-mode service for web deployments.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bundlesync::manifest::{BundleId, ManifestBuilder, PackageBundle};
/// use bundlesync::playmode::WebPlayMode;
/// use bundlesync::services::{HostRemoteServices, NoBuildinContent};
/// use bundlesync::transfer::DownloaderConfig;
///
/// let mode = WebPlayMode::new(
///     "DefaultPackage",
///     Arc::new(NoBuildinContent),
///     Arc::new(HostRemoteServices::single("https://cdn.example.com")),
/// );
/// assert!(!mode.is_services_valid());
///
/// let manifest = ManifestBuilder::new("DefaultPackage", "1.0.0")
///     .bundle(PackageBundle::new(BundleId(0), "core", "aa", 64))
///     .build()
///     .unwrap();
/// mode.set_active_manifest(manifest);
///
/// let downloader = mode.create_downloader_by_all(DownloaderConfig::default()).unwrap();
/// assert_eq!(downloader.total_count(), 1);
/// ```
#[derive(Debug)]
pub struct WebPlayMode {
    package_name: String,
    resolver: DownloadListResolver,
    active: RwLock<Option<Arc<PackageManifest>>>,
}

impl WebPlayMode {
    /// Create a play mode for `package_name`.
    pub fn new(
        package_name: impl Into<String>,
        buildin: Arc<dyn BuildinQueryServices>,
        remote: Arc<dyn RemoteServices>,
    ) -> Self {
        let package_name = package_name.into();
        let classifier = LocalityClassifier::new(package_name.clone(), buildin);
        Self {
            package_name,
            resolver: DownloadListResolver::new(classifier, remote),
            active: RwLock::new(None),
        }
    }

    /// Package served by this play mode.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Resolver used for download lists.
    pub fn resolver(&self) -> &DownloadListResolver {
        &self.resolver
    }

    /// Replace the active manifest.
    pub fn set_active_manifest(&self, manifest: impl Into<Arc<PackageManifest>>) {
        let manifest = manifest.into();
        info!(
            package = manifest.package_name(),
            version = manifest.package_version(),
            bundles = manifest.bundle_count(),
            "Activating manifest"
        );
        *self.active.write() = Some(manifest);
    }

    /// The active manifest, if any.
    pub fn active_manifest(&self) -> Option<Arc<PackageManifest>> {
        self.active.read().clone()
    }

    /// Returns true once a manifest is active.
    pub fn is_services_valid(&self) -> bool {
        self.active.read().is_some()
    }

    fn manifest(&self) -> PlayModeResult<Arc<PackageManifest>> {
        self.active_manifest()
            .ok_or_else(|| PlayModeError::NoActiveManifest {
                package_name: self.package_name.clone(),
            })
    }

    // =========================================================================
    // Downloaders
    // =========================================================================

    /// Download every bundle that is not build-in.
    pub fn create_downloader_by_all(
        &self,
        config: DownloaderConfig,
    ) -> PlayModeResult<TransferOperation> {
        let manifest = self.manifest()?;
        let list = self.resolver.resolve_all(&manifest);
        Ok(self.downloader(list, config))
    }

    /// Download untagged bundles plus those matching `tags`.
    pub fn create_downloader_by_tags<S: AsRef<str>>(
        &self,
        tags: &[S],
        config: DownloaderConfig,
    ) -> PlayModeResult<TransferOperation> {
        let manifest = self.manifest()?;
        let list = self.resolver.resolve_by_tags(&manifest, tags);
        Ok(self.downloader(list, config))
    }

    /// Download the bundles needed by `assets`.
    pub fn create_downloader_by_paths(
        &self,
        assets: &[AssetInfo],
        config: DownloaderConfig,
    ) -> PlayModeResult<TransferOperation> {
        let manifest = self.manifest()?;
        let list = self.resolver.resolve_by_assets(&manifest, assets);
        Ok(self.downloader(list, config))
    }

    fn downloader(&self, list: Vec<BundleInfo>, config: DownloaderConfig) -> TransferOperation {
        debug!(package = %self.package_name, bundles = list.len(), "Creating downloader");
        TransferOperation::new(TransferKind::Download, list, config)
    }

    // =========================================================================
    // Unpackers and importers
    // =========================================================================

    /// Nothing to unpack in web mode.
    pub fn create_unpacker_by_all(&self, config: DownloaderConfig) -> TransferOperation {
        TransferOperation::empty(TransferKind::Unpack, config)
    }

    /// Nothing to unpack in web mode.
    pub fn create_unpacker_by_tags<S: AsRef<str>>(
        &self,
        _tags: &[S],
        config: DownloaderConfig,
    ) -> TransferOperation {
        TransferOperation::empty(TransferKind::Unpack, config)
    }

    /// Nothing to import in web mode.
    pub fn create_importer_by_file_paths<P: AsRef<Path>>(
        &self,
        _file_paths: &[P],
        config: DownloaderConfig,
    ) -> TransferOperation {
        TransferOperation::empty(TransferKind::Import, config)
    }

    // =========================================================================
    // Bundle services
    // =========================================================================

    /// Main bundle of `asset` with its load location.
    pub fn get_bundle_info(&self, asset: &AssetInfo) -> PlayModeResult<BundleInfo> {
        let path = asset.validate()?;
        let manifest = self.manifest()?;
        let bundle = manifest.get_main_bundle(path)?;
        Ok(self.resolver.bundle_info(bundle))
    }

    /// Every dependency bundle of `asset` with its load location.
    pub fn get_all_depend_bundle_infos(&self, asset: &AssetInfo) -> PlayModeResult<Vec<BundleInfo>> {
        let path = asset.validate()?;
        let manifest = self.manifest()?;
        let depends = manifest.get_all_dependencies(path)?;
        Ok(depends
            .iter()
            .map(|bundle| self.resolver.bundle_info(bundle))
            .collect())
    }

    /// Bundle name for `id`.
    pub fn get_bundle_name(&self, id: BundleId) -> PlayModeResult<String> {
        let manifest = self.manifest()?;
        Ok(manifest.get_bundle_name(id)?.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ManifestBuilder, ManifestIntegrityError, PackageBundle};
    use crate::operation::{OperationHandle, OperationStatus};
    use crate::resolver::LoadMode;
    use crate::services::{BuildinCatalog, HostRemoteServices};

    fn mode() -> WebPlayMode {
        let catalog = BuildinCatalog::from_files("pkg", ["shared_00.bundle"]);
        let mode = WebPlayMode::new(
            "pkg",
            Arc::new(catalog),
            Arc::new(HostRemoteServices::new("http://main", "http://fallback")),
        );
        let manifest = ManifestBuilder::new("pkg", "2.1.0")
            .bundle(PackageBundle::new(BundleId(0), "shared", "00", 10))
            .bundle(PackageBundle::new(BundleId(1), "ui", "01", 20).with_dependencies([BundleId(0)]))
            .bundle(PackageBundle::new(BundleId(2), "dlc", "02", 30).with_tags(["dlc1"]))
            .asset("ui/menu.prefab", BundleId(1))
            .asset("dlc/boss.prefab", BundleId(2))
            .build()
            .unwrap();
        mode.set_active_manifest(manifest);
        mode
    }

    #[test]
    fn test_services_require_manifest() {
        let mode = WebPlayMode::new(
            "pkg",
            Arc::new(BuildinCatalog::new()),
            Arc::new(HostRemoteServices::single("http://main")),
        );
        assert!(!mode.is_services_valid());
        assert_eq!(
            mode.get_bundle_name(BundleId(0)),
            Err(PlayModeError::NoActiveManifest {
                package_name: "pkg".to_string()
            })
        );
        assert!(mode.create_downloader_by_all(DownloaderConfig::default()).is_err());
    }

    #[test]
    fn test_downloaders_exclude_buildin() {
        let mode = mode();
        assert!(mode.is_services_valid());

        let all = mode.create_downloader_by_all(DownloaderConfig::default()).unwrap();
        assert_eq!(all.total_count(), 2);
        assert_eq!(all.total_bytes(), 50);

        let tagged = mode
            .create_downloader_by_tags::<&str>(&[], DownloaderConfig::default())
            .unwrap();
        assert_eq!(tagged.total_count(), 1);

        let by_path = mode
            .create_downloader_by_paths(&[AssetInfo::new("ui/menu.prefab")], DownloaderConfig::default())
            .unwrap();
        assert_eq!(by_path.total_count(), 1);
        assert_eq!(by_path.bundles()[0].bundle.bundle_name, "ui");
    }

    #[test]
    fn test_unpacker_and_importer_are_empty() {
        let mode = mode();
        let config = DownloaderConfig::default();

        let unpacker = mode.create_unpacker_by_all(config.clone());
        assert_eq!(unpacker.status(), OperationStatus::Succeeded);
        assert_eq!(unpacker.total_count(), 0);

        let unpacker = mode.create_unpacker_by_tags(&["dlc1"], config.clone());
        assert_eq!(unpacker.kind(), TransferKind::Unpack);
        assert!(unpacker.is_done());

        let importer = mode.create_importer_by_file_paths(&["/tmp/a.bundle"], config);
        assert_eq!(importer.kind(), TransferKind::Import);
        assert_eq!(importer.status(), OperationStatus::Succeeded);
    }

    #[test]
    fn test_bundle_services() {
        let mode = mode();
        let asset = AssetInfo::new("ui/menu.prefab");

        let main = mode.get_bundle_info(&asset).unwrap();
        assert_eq!(main.load_mode(), LoadMode::FromRemote);
        assert_eq!(main.main_url(), Some("http://main/ui_01.bundle"));
        assert_eq!(main.fallback_url(), Some("http://fallback/ui_01.bundle"));

        let depends = mode.get_all_depend_bundle_infos(&asset).unwrap();
        assert_eq!(depends.len(), 1);
        assert_eq!(depends[0].load_mode(), LoadMode::FromLocal);

        assert_eq!(mode.get_bundle_name(BundleId(2)).unwrap(), "dlc");
    }

    #[test]
    fn test_bundle_services_reject_bad_assets() {
        let mode = mode();

        let err = mode
            .get_bundle_info(&AssetInfo::invalid("x", "unknown location"))
            .unwrap_err();
        assert!(matches!(err, PlayModeError::InvalidAsset(_)));

        let err = mode
            .get_all_depend_bundle_infos(&AssetInfo::new("missing.prefab"))
            .unwrap_err();
        assert_eq!(
            err,
            PlayModeError::Integrity(ManifestIntegrityError::MissingAsset {
                path: "missing.prefab".to_string()
            })
        );
    }

    #[test]
    fn test_manifest_replaced_wholesale() {
        let mode = mode();
        let before = mode.active_manifest().unwrap();

        let next = ManifestBuilder::new("pkg", "2.2.0").build().unwrap();
        mode.set_active_manifest(next);

        assert_eq!(before.package_version(), "2.1.0");
        assert_eq!(mode.active_manifest().unwrap().package_version(), "2.2.0");
        assert_eq!(before.bundle_count(), 3);
    }
}
