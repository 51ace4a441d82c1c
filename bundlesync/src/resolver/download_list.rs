//! Builds the list of bundles that must be downloaded.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::bundle_info::{BundleInfo, FetchDescriptor};
use super::locality::LocalityClassifier;
use crate::manifest::{AssetInfo, BundleId, ManifestResult, PackageBundle, PackageManifest};
use crate::services::RemoteServices;

/// Resolves download lists against a manifest snapshot.
///
/// Every operation is a pure function of the manifest, the request and the
/// collaborators, so results are deterministic and ordered.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use bundlesync::manifest::{BundleId, ManifestBuilder, PackageBundle};
/// use bundlesync::resolver::{DownloadListResolver, LocalityClassifier};
/// use bundlesync::services::{HostRemoteServices, NoBuildinContent};
///
/// let manifest = ManifestBuilder::new("pkg", "1.0")
///     .bundle(PackageBundle::new(BundleId(0), "core", "aa", 10))
///     .build()
///     .unwrap();
///
/// let resolver = DownloadListResolver::new(
///     LocalityClassifier::new("pkg", Arc::new(NoBuildinContent)),
///     Arc::new(HostRemoteServices::single("http://cdn.example.com")),
/// );
///
/// let list = resolver.resolve_all(&manifest);
/// assert_eq!(list.len(), 1);
/// assert_eq!(list[0].main_url(), Some("http://cdn.example.com/core_aa.bundle"));
/// ```
#[derive(Clone)]
pub struct DownloadListResolver {
    classifier: LocalityClassifier,
    remote: Arc<dyn RemoteServices>,
}

impl DownloadListResolver {
    /// Create a resolver from its collaborators.
    pub fn new(classifier: LocalityClassifier, remote: Arc<dyn RemoteServices>) -> Self {
        Self { classifier, remote }
    }

    /// The locality classifier in use.
    pub fn classifier(&self) -> &LocalityClassifier {
        &self.classifier
    }

    /// Every non-local bundle, in manifest declaration order.
    pub fn resolve_all(&self, manifest: &PackageManifest) -> Vec<FetchDescriptor> {
        self.collect(manifest.bundles().iter())
    }

    /// Non-local bundles that are untagged or share a tag with `tags`.
    ///
    /// Untagged bundles are common content and are included for any tag
    /// set, including an empty one.
    pub fn resolve_by_tags<S: AsRef<str>>(
        &self,
        manifest: &PackageManifest,
        tags: &[S],
    ) -> Vec<FetchDescriptor> {
        self.collect(
            manifest
                .bundles()
                .iter()
                .filter(|bundle| !bundle.has_any_tags() || bundle.has_tag(tags)),
        )
    }

    /// Non-local bundles needed by `assets` (main bundles plus their
    /// transitive dependencies).
    ///
    /// Invalid or unknown assets are skipped with a warning; the rest of the
    /// batch still resolves. Each bundle appears once, in first-seen order.
    pub fn resolve_by_assets(
        &self,
        manifest: &PackageManifest,
        assets: &[AssetInfo],
    ) -> Vec<FetchDescriptor> {
        let mut seen: HashSet<BundleId> = HashSet::new();
        let mut closure: Vec<Arc<PackageBundle>> = Vec::new();

        for asset in assets {
            let path = match asset.validate() {
                Ok(path) => path,
                Err(e) => {
                    warn!(asset = asset.asset_path(), error = %e, "Skipping invalid asset request");
                    continue;
                }
            };

            let bundles = match asset_closure(manifest, path) {
                Ok(bundles) => bundles,
                Err(e) => {
                    warn!(asset = path, error = %e, "Skipping unresolvable asset");
                    continue;
                }
            };

            for bundle in bundles {
                if seen.insert(bundle.id) {
                    closure.push(bundle);
                }
            }
        }

        self.collect(closure.iter())
    }

    /// Map a single bundle to its load location.
    ///
    /// Local bundles carry no URLs; remote ones always carry both.
    pub fn bundle_info(&self, bundle: &Arc<PackageBundle>) -> BundleInfo {
        if self.classifier.is_local(bundle) {
            BundleInfo::local(Arc::clone(bundle))
        } else {
            self.remote_info(bundle)
        }
    }

    fn remote_info(&self, bundle: &Arc<PackageBundle>) -> FetchDescriptor {
        BundleInfo::remote(
            Arc::clone(bundle),
            self.remote.remote_main_url(&bundle.file_name),
            self.remote.remote_fallback_url(&bundle.file_name),
        )
    }

    fn collect<'a>(
        &self,
        candidates: impl Iterator<Item = &'a Arc<PackageBundle>>,
    ) -> Vec<FetchDescriptor> {
        let list: Vec<FetchDescriptor> = candidates
            .filter(|bundle| !self.classifier.is_local(bundle))
            .map(|bundle| self.remote_info(bundle))
            .collect();

        debug!(count = list.len(), "Resolved download list");
        list
    }
}

impl fmt::Debug for DownloadListResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadListResolver")
            .field("classifier", &self.classifier)
            .finish_non_exhaustive()
    }
}

/// Main bundle followed by its dependency closure.
fn asset_closure(
    manifest: &PackageManifest,
    asset_path: &str,
) -> ManifestResult<Vec<Arc<PackageBundle>>> {
    let main = Arc::clone(manifest.get_main_bundle(asset_path)?);
    let mut bundles = Vec::with_capacity(1);
    bundles.push(main);
    bundles.extend(manifest.get_all_dependencies(asset_path)?);
    Ok(bundles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestBuilder;
    use crate::services::{BuildinCatalog, HostRemoteServices, NoBuildinContent};

    fn resolver_with(catalog: BuildinCatalog) -> DownloadListResolver {
        DownloadListResolver::new(
            LocalityClassifier::new("pkg", Arc::new(catalog)),
            Arc::new(HostRemoteServices::new("http://main", "http://fallback")),
        )
    }

    fn remote_resolver() -> DownloadListResolver {
        DownloadListResolver::new(
            LocalityClassifier::new("pkg", Arc::new(NoBuildinContent)),
            Arc::new(HostRemoteServices::new("http://main", "http://fallback")),
        )
    }

    fn names(list: &[FetchDescriptor]) -> Vec<&str> {
        list.iter().map(|info| info.bundle.bundle_name.as_str()).collect()
    }

    fn sample_manifest() -> PackageManifest {
        ManifestBuilder::new("pkg", "1.0")
            .bundle(PackageBundle::new(BundleId(0), "shared", "00", 1))
            .bundle(PackageBundle::new(BundleId(1), "ui", "01", 1).with_dependencies([BundleId(0)]))
            .bundle(
                PackageBundle::new(BundleId(2), "dlc", "02", 1)
                    .with_tags(["dlc1"])
                    .with_dependencies([BundleId(0)]),
            )
            .asset("ui/menu.prefab", BundleId(1))
            .asset("dlc/boss.prefab", BundleId(2))
            .build()
            .unwrap()
    }

    #[test]
    fn test_resolve_all_keeps_declaration_order() {
        let list = remote_resolver().resolve_all(&sample_manifest());
        assert_eq!(names(&list), vec!["shared", "ui", "dlc"]);
    }

    #[test]
    fn test_resolve_all_populates_both_urls() {
        let list = remote_resolver().resolve_all(&sample_manifest());
        let first = &list[0];
        assert_eq!(first.main_url(), Some("http://main/shared_00.bundle"));
        assert_eq!(first.fallback_url(), Some("http://fallback/shared_00.bundle"));
    }

    #[test]
    fn test_resolve_all_excludes_local() {
        let manifest = sample_manifest();
        let catalog = BuildinCatalog::from_files("pkg", ["shared_00.bundle"]);
        let list = resolver_with(catalog).resolve_all(&manifest);
        assert_eq!(names(&list), vec!["ui", "dlc"]);
    }

    #[test]
    fn test_resolve_all_empty_manifest() {
        let manifest = ManifestBuilder::new("pkg", "1.0").build().unwrap();
        assert!(remote_resolver().resolve_all(&manifest).is_empty());
    }

    #[test]
    fn test_resolve_by_tags_untagged_always_included() {
        let manifest = sample_manifest();
        let resolver = remote_resolver();

        assert_eq!(names(&resolver.resolve_by_tags::<&str>(&manifest, &[])), vec!["shared", "ui"]);
        assert_eq!(
            names(&resolver.resolve_by_tags(&manifest, &["dlc1"])),
            vec!["shared", "ui", "dlc"]
        );
        assert_eq!(names(&resolver.resolve_by_tags(&manifest, &["dlc2"])), vec!["shared", "ui"]);
    }

    #[test]
    fn test_resolve_by_assets_includes_dependencies_once() {
        let manifest = sample_manifest();
        let list = remote_resolver().resolve_by_assets(
            &manifest,
            &[AssetInfo::new("ui/menu.prefab"), AssetInfo::new("dlc/boss.prefab")],
        );
        assert_eq!(names(&list), vec!["ui", "shared", "dlc"]);
    }

    #[test]
    fn test_resolve_by_assets_skips_bad_requests() {
        let manifest = sample_manifest();
        let list = remote_resolver().resolve_by_assets(
            &manifest,
            &[
                AssetInfo::invalid("broken", "not found in any package"),
                AssetInfo::new("missing/asset.prefab"),
                AssetInfo::new("ui/menu.prefab"),
            ],
        );
        assert_eq!(names(&list), vec!["ui", "shared"]);
    }

    #[test]
    fn test_resolve_by_assets_excludes_local_after_dedup() {
        let manifest = sample_manifest();
        let catalog = BuildinCatalog::from_files("pkg", ["shared_00.bundle"]);
        let list = resolver_with(catalog)
            .resolve_by_assets(&manifest, &[AssetInfo::new("dlc/boss.prefab")]);
        assert_eq!(names(&list), vec!["dlc"]);
    }

    #[test]
    fn test_bundle_info_maps_locality() {
        let manifest = sample_manifest();
        let catalog = BuildinCatalog::from_files("pkg", ["shared_00.bundle"]);
        let resolver = resolver_with(catalog);

        let shared = manifest.get_bundle(BundleId(0)).unwrap();
        let ui = manifest.get_bundle(BundleId(1)).unwrap();

        assert_eq!(resolver.bundle_info(shared), BundleInfo::local(Arc::clone(shared)));
        assert_eq!(
            resolver.bundle_info(ui).main_url(),
            Some("http://main/ui_01.bundle")
        );
    }
}
