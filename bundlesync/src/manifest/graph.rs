//! Immutable manifest snapshot and its builder.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use super::bundle::{BundleId, PackageBundle};
use super::error::{ManifestIntegrityError, ManifestResult};

/// Index entry for one asset path.
#[derive(Debug, Clone)]
struct AssetEntry {
    /// Position of the owning bundle in `bundles`.
    main: usize,
    /// Positions of all dependency bundles, first-visit order, main excluded.
    depends: Vec<usize>,
}

/// Immutable snapshot of one package version.
///
/// Constructed once per package activation through [`ManifestBuilder`] and
/// replaced wholesale on update. Consumers share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    package_name: String,
    package_version: String,
    bundles: Vec<Arc<PackageBundle>>,
    bundle_index: HashMap<BundleId, usize>,
    assets: HashMap<String, AssetEntry>,
}

impl PackageManifest {
    /// Name of the package this manifest describes.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Version string of the package.
    pub fn package_version(&self) -> &str {
        &self.package_version
    }

    /// All bundles in declaration order.
    pub fn bundles(&self) -> &[Arc<PackageBundle>] {
        &self.bundles
    }

    /// Number of bundles.
    pub fn bundle_count(&self) -> usize {
        self.bundles.len()
    }

    /// Number of indexed asset paths.
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Returns true if the asset path is indexed.
    pub fn contains_asset(&self, asset_path: &str) -> bool {
        self.assets.contains_key(asset_path)
    }

    /// Look up a bundle by id.
    pub fn get_bundle(&self, id: BundleId) -> ManifestResult<&Arc<PackageBundle>> {
        self.bundle_index
            .get(&id)
            .map(|&i| &self.bundles[i])
            .ok_or(ManifestIntegrityError::MissingBundle { id })
    }

    /// The bundle that owns `asset_path`.
    pub fn get_main_bundle(&self, asset_path: &str) -> ManifestResult<&Arc<PackageBundle>> {
        let entry = self.entry(asset_path)?;
        Ok(&self.bundles[entry.main])
    }

    /// Every bundle `asset_path` depends on, direct and transitive.
    ///
    /// The result is deduplicated, in first-visit order, and never contains
    /// the asset's main bundle.
    pub fn get_all_dependencies(&self, asset_path: &str) -> ManifestResult<Vec<Arc<PackageBundle>>> {
        let entry = self.entry(asset_path)?;
        Ok(entry
            .depends
            .iter()
            .map(|&i| Arc::clone(&self.bundles[i]))
            .collect())
    }

    /// The logical name of a bundle.
    pub fn get_bundle_name(&self, id: BundleId) -> ManifestResult<&str> {
        self.get_bundle(id).map(|b| b.bundle_name.as_str())
    }

    fn entry(&self, asset_path: &str) -> ManifestResult<&AssetEntry> {
        self.assets
            .get(asset_path)
            .ok_or_else(|| ManifestIntegrityError::MissingAsset {
                path: asset_path.to_string(),
            })
    }
}

/// Pending asset registration.
#[derive(Debug, Clone)]
struct AssetDecl {
    path: String,
    main: BundleId,
    depends: Vec<BundleId>,
}

/// Builder for [`PackageManifest`].
///
/// Bundles keep the order they are added in. `build()` validates that the
/// graph is closed and precomputes each asset's dependency closure.
#[derive(Debug, Clone, Default)]
pub struct ManifestBuilder {
    package_name: String,
    package_version: String,
    bundles: Vec<PackageBundle>,
    assets: Vec<AssetDecl>,
}

impl ManifestBuilder {
    /// Start a manifest for the given package and version.
    pub fn new(package_name: impl Into<String>, package_version: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            package_version: package_version.into(),
            ..Default::default()
        }
    }

    /// Append a bundle.
    pub fn bundle(mut self, bundle: PackageBundle) -> Self {
        self.bundles.push(bundle);
        self
    }

    /// Append several bundles.
    pub fn bundles(mut self, bundles: impl IntoIterator<Item = PackageBundle>) -> Self {
        self.bundles.extend(bundles);
        self
    }

    /// Register an asset owned by `main`.
    ///
    /// The asset depends on whatever `main` depends on.
    pub fn asset(self, path: impl Into<String>, main: BundleId) -> Self {
        self.asset_with_dependencies(path, main, [])
    }

    /// Register an asset with dependencies recorded by the packer on top of
    /// the main bundle's own edges.
    pub fn asset_with_dependencies(
        mut self,
        path: impl Into<String>,
        main: BundleId,
        depends: impl IntoIterator<Item = BundleId>,
    ) -> Self {
        self.assets.push(AssetDecl {
            path: path.into(),
            main,
            depends: depends.into_iter().collect(),
        });
        self
    }

    /// Validate the graph and produce the immutable snapshot.
    pub fn build(self) -> ManifestResult<PackageManifest> {
        let mut bundle_index = HashMap::with_capacity(self.bundles.len());
        for (i, bundle) in self.bundles.iter().enumerate() {
            if bundle_index.insert(bundle.id, i).is_some() {
                return Err(ManifestIntegrityError::DuplicateBundle { id: bundle.id });
            }
        }

        for bundle in &self.bundles {
            for dep in &bundle.depend_ids {
                if !bundle_index.contains_key(dep) {
                    return Err(ManifestIntegrityError::DanglingDependency {
                        owner: format!("bundle {}", bundle.bundle_name),
                        dependency: *dep,
                    });
                }
            }
        }

        let bundles: Vec<Arc<PackageBundle>> = self.bundles.into_iter().map(Arc::new).collect();

        let mut assets = HashMap::with_capacity(self.assets.len());
        for decl in self.assets {
            let main = *bundle_index.get(&decl.main).ok_or_else(|| {
                ManifestIntegrityError::DanglingDependency {
                    owner: format!("asset {}", decl.path),
                    dependency: decl.main,
                }
            })?;

            let mut seeds = Vec::with_capacity(decl.depends.len());
            for dep in &decl.depends {
                let i = *bundle_index.get(dep).ok_or_else(|| {
                    ManifestIntegrityError::DanglingDependency {
                        owner: format!("asset {}", decl.path),
                        dependency: *dep,
                    }
                })?;
                seeds.push(i);
            }

            let depends = dependency_closure(&bundles, &bundle_index, main, seeds);
            if assets
                .insert(decl.path.clone(), AssetEntry { main, depends })
                .is_some()
            {
                return Err(ManifestIntegrityError::DuplicateAsset { path: decl.path });
            }
        }

        Ok(PackageManifest {
            package_name: self.package_name,
            package_version: self.package_version,
            bundles,
            bundle_index,
            assets,
        })
    }
}

/// Breadth-first closure over dependency edges.
///
/// Explicit asset dependencies are visited first, then the main bundle's
/// edges. Cycles terminate on the visited set; the main bundle is excluded.
fn dependency_closure(
    bundles: &[Arc<PackageBundle>],
    bundle_index: &HashMap<BundleId, usize>,
    main: usize,
    seeds: Vec<usize>,
) -> Vec<usize> {
    let mut visited = HashSet::from([main]);
    let mut order = Vec::new();

    let mut queue: VecDeque<usize> = seeds.into();
    queue.extend(
        bundles[main]
            .depend_ids
            .iter()
            .filter_map(|id| bundle_index.get(id).copied()),
    );

    while let Some(i) = queue.pop_front() {
        if !visited.insert(i) {
            continue;
        }
        order.push(i);
        queue.extend(
            bundles[i]
                .depend_ids
                .iter()
                .filter_map(|id| bundle_index.get(id).copied()),
        );
    }

    order
}
