//! Property tests for download-list resolution.
//!
//! Run with: `cargo test --test resolver_properties`

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use bundlesync::manifest::{AssetInfo, BundleId, ManifestBuilder, PackageBundle, PackageManifest};
use bundlesync::resolver::{DownloadListResolver, LocalityClassifier};
use bundlesync::services::{BuildinCatalog, HostRemoteServices};

const TAGS: [&str; 3] = ["dlc1", "dlc2", "hd"];

#[derive(Debug, Clone)]
struct BundleShape {
    tags: Vec<usize>,
    depends: Vec<usize>,
    local: bool,
}

#[derive(Debug, Clone)]
struct Fixture {
    bundles: Vec<BundleShape>,
    requested: Vec<usize>,
    tag_filter: Vec<usize>,
}

fn fixture_strategy() -> impl Strategy<Value = Fixture> {
    (1usize..10).prop_flat_map(|n| {
        let shape = (
            prop::collection::vec(0usize..TAGS.len(), 0..3),
            prop::collection::vec(0..n, 0..4),
            any::<bool>(),
        )
            .prop_map(|(tags, depends, local)| BundleShape {
                tags,
                depends,
                local,
            });
        (
            prop::collection::vec(shape, n),
            prop::collection::vec(0..n, 0..6),
            prop::collection::vec(0usize..TAGS.len(), 0..3),
        )
            .prop_map(|(bundles, requested, tag_filter)| Fixture {
                bundles,
                requested,
                tag_filter,
            })
    })
}

struct Built {
    manifest: PackageManifest,
    resolver: DownloadListResolver,
    local_files: HashSet<String>,
    assets: Vec<AssetInfo>,
    tags: Vec<&'static str>,
}

fn build(fixture: &Fixture) -> Built {
    let mut builder = ManifestBuilder::new("pkg", "1");
    let mut catalog = BuildinCatalog::new();
    let mut local_files = HashSet::new();

    for (i, shape) in fixture.bundles.iter().enumerate() {
        let mut tags: Vec<&str> = shape.tags.iter().map(|t| TAGS[*t]).collect();
        tags.sort_unstable();
        tags.dedup();
        let depends: Vec<BundleId> = shape
            .depends
            .iter()
            .filter(|d| **d != i)
            .map(|d| BundleId(*d as u32))
            .collect();

        let bundle = PackageBundle::new(BundleId(i as u32), format!("b{}", i), format!("{:04x}", i), 10)
            .with_tags(tags)
            .with_dependencies(depends);
        if shape.local {
            catalog.insert("pkg", bundle.file_name.clone());
            local_files.insert(bundle.file_name.clone());
        }
        builder = builder
            .bundle(bundle)
            .asset(format!("asset{}", i), BundleId(i as u32));
    }

    let resolver = DownloadListResolver::new(
        LocalityClassifier::new("pkg", Arc::new(catalog)),
        Arc::new(HostRemoteServices::new("http://main", "http://fallback")),
    );

    Built {
        manifest: builder.build().unwrap(),
        resolver,
        local_files,
        assets: fixture
            .requested
            .iter()
            .map(|i| AssetInfo::new(format!("asset{}", i)))
            .collect(),
        tags: fixture.tag_filter.iter().map(|t| TAGS[*t]).collect(),
    }
}

proptest! {
    #[test]
    fn test_resolution_is_deterministic(fixture in fixture_strategy()) {
        let b = build(&fixture);

        prop_assert_eq!(b.resolver.resolve_all(&b.manifest), b.resolver.resolve_all(&b.manifest));
        prop_assert_eq!(
            b.resolver.resolve_by_tags(&b.manifest, &b.tags),
            b.resolver.resolve_by_tags(&b.manifest, &b.tags)
        );
        prop_assert_eq!(
            b.resolver.resolve_by_assets(&b.manifest, &b.assets),
            b.resolver.resolve_by_assets(&b.manifest, &b.assets)
        );
    }

    #[test]
    fn test_each_bundle_listed_at_most_once(fixture in fixture_strategy()) {
        let b = build(&fixture);
        let list = b.resolver.resolve_by_assets(&b.manifest, &b.assets);

        let mut seen = HashSet::new();
        for info in &list {
            prop_assert!(seen.insert(info.bundle.id), "duplicate {}", info.bundle.id);
        }
    }

    #[test]
    fn test_local_bundles_never_listed(fixture in fixture_strategy()) {
        let b = build(&fixture);
        let lists = [
            b.resolver.resolve_all(&b.manifest),
            b.resolver.resolve_by_tags(&b.manifest, &b.tags),
            b.resolver.resolve_by_assets(&b.manifest, &b.assets),
        ];

        for list in &lists {
            for info in list {
                prop_assert!(!b.local_files.contains(&info.bundle.file_name));
            }
        }
    }

    #[test]
    fn test_tag_filter_rule(fixture in fixture_strategy()) {
        let b = build(&fixture);
        let listed: HashSet<BundleId> = b
            .resolver
            .resolve_by_tags(&b.manifest, &b.tags)
            .iter()
            .map(|info| info.bundle.id)
            .collect();

        for bundle in b.manifest.bundles() {
            if b.local_files.contains(&bundle.file_name) {
                continue;
            }
            let expected = bundle.tags.is_empty()
                || bundle.tags.iter().any(|tag| b.tags.iter().any(|wanted| *wanted == tag.as_str()));
            prop_assert_eq!(listed.contains(&bundle.id), expected, "bundle {}", bundle.id);
        }
    }

    #[test]
    fn test_untagged_included_for_any_tag_set(fixture in fixture_strategy()) {
        let b = build(&fixture);
        let empty: [&str; 0] = [];
        let with_empty: HashSet<BundleId> = b
            .resolver
            .resolve_by_tags(&b.manifest, &empty)
            .iter()
            .map(|info| info.bundle.id)
            .collect();

        for bundle in b.manifest.bundles() {
            if bundle.tags.is_empty() && !b.local_files.contains(&bundle.file_name) {
                prop_assert!(with_empty.contains(&bundle.id));
            }
        }
    }

    #[test]
    fn test_asset_closure_is_complete(fixture in fixture_strategy()) {
        let b = build(&fixture);
        let listed: HashSet<BundleId> = b
            .resolver
            .resolve_by_assets(&b.manifest, &b.assets)
            .iter()
            .map(|info| info.bundle.id)
            .collect();

        let mut expected = HashSet::new();
        for asset in &b.assets {
            let path = asset.asset_path();
            let main = b.manifest.get_main_bundle(path).unwrap();
            let depends = b.manifest.get_all_dependencies(path).unwrap();
            for bundle in std::iter::once(main.clone()).chain(depends) {
                if !b.local_files.contains(&bundle.file_name) {
                    expected.insert(bundle.id);
                }
            }
        }

        prop_assert_eq!(listed, expected);
    }
}
