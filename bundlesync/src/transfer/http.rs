//! HTTP bundle fetcher with an on-disk cache.
//!
//! Bundles are streamed into `<cache_dir>/<file_name>.part`, checked against
//! the manifest's size and SHA-256, then renamed into place. A bundle that is
//! already cached with the right size and hash is not fetched again.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

use super::checksum::{calculate_file_checksum, verify_checksum};
use super::error::{TransferError, TransferResult};
use super::fetcher::{BundleFetcher, FetchRequest};
use crate::manifest::PackageBundle;

/// Default connect timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP implementation of [`BundleFetcher`].
#[derive(Debug, Clone)]
pub struct HttpBundleFetcher {
    client: Client,
    cache_dir: PathBuf,
    verify_checksums: bool,
}

impl HttpBundleFetcher {
    /// Create a fetcher writing into `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> TransferResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransferError::Client(e.to_string()))?;
        Ok(Self::with_client(client, cache_dir))
    }

    /// Create a fetcher with a preconfigured client.
    pub fn with_client(client: Client, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            cache_dir: cache_dir.into(),
            verify_checksums: true,
        }
    }

    /// Enable or disable SHA-256 verification.
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Final location of a bundle in the cache.
    pub fn cache_path(&self, bundle: &PackageBundle) -> PathBuf {
        self.cache_dir.join(&bundle.file_name)
    }

    /// Returns true if the bundle is already cached and intact.
    pub async fn is_cached(&self, bundle: &PackageBundle) -> bool {
        let path = self.cache_path(bundle);
        let Ok(metadata) = fs::metadata(&path).await else {
            return false;
        };
        if metadata.len() != bundle.file_size {
            return false;
        }
        if !self.verify_checksums {
            return true;
        }
        match calculate_file_checksum(&path).await {
            Ok(actual) => actual.eq_ignore_ascii_case(&bundle.file_hash),
            Err(_) => false,
        }
    }

    async fn download(
        &self,
        request: FetchRequest<'_>,
        on_bytes: &(dyn Fn(u64) + Send + Sync),
    ) -> TransferResult<u64> {
        let bundle = request.bundle;
        let dest = self.cache_path(bundle);

        if self.is_cached(bundle).await {
            debug!(file = %bundle.file_name, "Bundle already cached");
            on_bytes(bundle.file_size);
            return Ok(bundle.file_size);
        }

        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| TransferError::io(&self.cache_dir, e))?;

        let mut response = self
            .client
            .get(request.url)
            .send()
            .await
            .map_err(|e| fetch_failed(request.url, e))?;

        if !response.status().is_success() {
            return Err(TransferError::FetchFailed {
                url: request.url.to_string(),
                reason: format!("HTTP status {}", response.status()),
            });
        }

        let part = part_path(&dest);
        let file = fs::File::create(&part)
            .await
            .map_err(|e| TransferError::io(&part, e))?;
        let mut writer = BufWriter::new(file);

        let mut received: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| fetch_failed(request.url, e))?
        {
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| TransferError::io(&part, e))?;
            received += chunk.len() as u64;
            on_bytes(chunk.len() as u64);
        }
        writer
            .flush()
            .await
            .map_err(|e| TransferError::io(&part, e))?;
        drop(writer);

        if let Err(e) = self.verify(bundle, &part, received).await {
            let _ = fs::remove_file(&part).await;
            return Err(e);
        }

        fs::rename(&part, &dest)
            .await
            .map_err(|e| TransferError::io(&dest, e))?;

        debug!(file = %bundle.file_name, bytes = received, "Bundle written to cache");
        Ok(received)
    }

    async fn verify(&self, bundle: &PackageBundle, path: &Path, received: u64) -> TransferResult<()> {
        if bundle.file_size > 0 && received != bundle.file_size {
            return Err(TransferError::SizeMismatch {
                file_name: bundle.file_name.clone(),
                expected: bundle.file_size,
                actual: received,
            });
        }
        if self.verify_checksums {
            verify_checksum(path, &bundle.file_name, &bundle.file_hash).await?;
        }
        Ok(())
    }
}

impl BundleFetcher for HttpBundleFetcher {
    fn fetch<'a>(
        &'a self,
        request: FetchRequest<'a>,
        on_bytes: &'a (dyn Fn(u64) + Send + Sync),
    ) -> BoxFuture<'a, TransferResult<u64>> {
        Box::pin(self.download(request, on_bytes))
    }
}

fn fetch_failed(url: &str, error: reqwest::Error) -> TransferError {
    TransferError::FetchFailed {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BundleId;
    use std::sync::atomic::{AtomicU64, Ordering};

    // sha256("hello")
    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    fn hello_bundle() -> PackageBundle {
        PackageBundle::new(BundleId(0), "hello", HELLO_SHA256, 5)
    }

    #[test]
    fn test_cache_path_and_part_path() {
        let fetcher = HttpBundleFetcher::with_client(Client::new(), "/cache");
        let path = fetcher.cache_path(&hello_bundle());
        assert_eq!(path, PathBuf::from(format!("/cache/hello_{}.bundle", HELLO_SHA256)));
        assert_eq!(
            part_path(&path),
            PathBuf::from(format!("/cache/hello_{}.bundle.part", HELLO_SHA256))
        );
    }

    #[tokio::test]
    async fn test_cached_bundle_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpBundleFetcher::with_client(Client::new(), dir.path());
        let bundle = hello_bundle();
        fs::write(fetcher.cache_path(&bundle), b"hello").await.unwrap();

        let reported = AtomicU64::new(0);
        let on_bytes = |n: u64| {
            reported.fetch_add(n, Ordering::SeqCst);
        };
        // Unroutable URL: any network access would fail the test.
        let request = FetchRequest {
            bundle: &bundle,
            url: "http://127.0.0.1:9/never",
            attempt: 0,
        };

        assert_eq!(fetcher.fetch(request, &on_bytes).await.unwrap(), 5);
        assert_eq!(reported.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_is_not_trusted() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpBundleFetcher::with_client(Client::new(), dir.path());
        let bundle = hello_bundle();
        fs::write(fetcher.cache_path(&bundle), b"HELLO").await.unwrap();

        assert!(!fetcher.is_cached(&bundle).await);
        assert!(fetcher.clone().with_verify_checksums(false).is_cached(&bundle).await);
    }

    #[tokio::test]
    async fn test_size_mismatch_detected() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = HttpBundleFetcher::with_client(Client::new(), dir.path());
        let path = dir.path().join("x.part");
        fs::write(&path, b"hell").await.unwrap();

        let err = fetcher.verify(&hello_bundle(), &path, 4).await.unwrap_err();
        assert!(matches!(err, TransferError::SizeMismatch { expected: 5, actual: 4, .. }));
    }
}
