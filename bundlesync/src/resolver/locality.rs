//! Local availability classification.

use std::fmt;
use std::sync::Arc;

use crate::manifest::PackageBundle;
use crate::services::BuildinQueryServices;

/// Decides whether a bundle is already present locally.
///
/// Delegates to the injected build-in query for the configured package.
#[derive(Clone)]
pub struct LocalityClassifier {
    package_name: String,
    query: Arc<dyn BuildinQueryServices>,
}

impl LocalityClassifier {
    /// Create a classifier for `package_name`.
    pub fn new(package_name: impl Into<String>, query: Arc<dyn BuildinQueryServices>) -> Self {
        Self {
            package_name: package_name.into(),
            query,
        }
    }

    /// The package this classifier answers for.
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Returns true if the bundle ships with the application.
    pub fn is_local(&self, bundle: &PackageBundle) -> bool {
        self.query
            .query_streaming_assets(&self.package_name, &bundle.file_name)
    }
}

impl fmt::Debug for LocalityClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalityClassifier")
            .field("package_name", &self.package_name)
            .finish_non_exhaustive()
    }
}
