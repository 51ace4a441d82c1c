//! Raw bundle fetch collaborator.

use futures::future::BoxFuture;

use super::error::TransferResult;
use crate::manifest::PackageBundle;

/// One fetch attempt for one bundle.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// Bundle being fetched.
    pub bundle: &'a PackageBundle,
    /// Address for this attempt (primary or fallback).
    pub url: &'a str,
    /// Zero-based attempt number.
    pub attempt: u32,
}

/// Transfers bundle bytes from a URL.
///
/// Implementations report received bytes through `on_bytes` as deltas and
/// resolve to the total byte count. Deadlines and retries are handled by
/// the caller.
pub trait BundleFetcher: Send + Sync + 'static {
    /// Fetch `request.bundle` from `request.url`.
    fn fetch<'a>(
        &'a self,
        request: FetchRequest<'a>,
        on_bytes: &'a (dyn Fn(u64) + Send + Sync),
    ) -> BoxFuture<'a, TransferResult<u64>>;
}
