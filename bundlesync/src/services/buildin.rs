//! Build-in (shipped with the application) content queries.

use std::collections::{HashMap, HashSet};

/// Answers whether a bundle file ships inside the application.
pub trait BuildinQueryServices: Send + Sync {
    /// Returns true if `file_name` of `package_name` is available locally.
    fn query_streaming_assets(&self, package_name: &str, file_name: &str) -> bool;
}

/// Nothing ships with the application; every bundle is remote.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBuildinContent;

impl BuildinQueryServices for NoBuildinContent {
    fn query_streaming_assets(&self, _package_name: &str, _file_name: &str) -> bool {
        false
    }
}

/// In-memory catalog of build-in files, grouped by package.
///
/// Lookups are two hash probes.
#[derive(Debug, Clone, Default)]
pub struct BuildinCatalog {
    packages: HashMap<String, HashSet<String>>,
}

impl BuildinCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog for one package from a list of file names.
    pub fn from_files<I, S>(package_name: &str, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::new();
        for file in files {
            catalog.insert(package_name, file);
        }
        catalog
    }

    /// Record a build-in file.
    pub fn insert(&mut self, package_name: &str, file_name: impl Into<String>) {
        self.packages
            .entry(package_name.to_string())
            .or_default()
            .insert(file_name.into());
    }

    /// Total number of recorded files across packages.
    pub fn len(&self) -> usize {
        self.packages.values().map(HashSet::len).sum()
    }

    /// Returns true if no file is recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BuildinQueryServices for BuildinCatalog {
    fn query_streaming_assets(&self, package_name: &str, file_name: &str) -> bool {
        self.packages
            .get(package_name)
            .is_some_and(|files| files.contains(file_name))
    }
}
