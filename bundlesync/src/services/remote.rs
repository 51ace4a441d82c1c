//! Remote URL mapping.

/// Maps a bundle file name to its remote addresses.
///
/// Implementations must return the same URLs for the same file name within a
/// session; the transport retries against the fallback without re-resolving.
pub trait RemoteServices: Send + Sync {
    /// Primary address of the file.
    fn remote_main_url(&self, file_name: &str) -> String;

    /// Fallback address of the file.
    fn remote_fallback_url(&self, file_name: &str) -> String;
}

/// Remote services backed by two base URLs (CDN plus mirror).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRemoteServices {
    main_host: String,
    fallback_host: String,
}

impl HostRemoteServices {
    /// Create remote services from a primary and a fallback base URL.
    ///
    /// Trailing slashes are trimmed so joining never doubles them.
    pub fn new(main_host: impl Into<String>, fallback_host: impl Into<String>) -> Self {
        Self {
            main_host: trim_host(main_host.into()),
            fallback_host: trim_host(fallback_host.into()),
        }
    }

    /// Use the same base URL for both addresses.
    pub fn single(host: impl Into<String>) -> Self {
        let host = host.into();
        Self::new(host.clone(), host)
    }

    /// The primary base URL.
    pub fn main_host(&self) -> &str {
        &self.main_host
    }

    /// The fallback base URL.
    pub fn fallback_host(&self) -> &str {
        &self.fallback_host
    }
}

impl RemoteServices for HostRemoteServices {
    fn remote_main_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.main_host, file_name)
    }

    fn remote_fallback_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.fallback_host, file_name)
    }
}

fn trim_host(host: String) -> String {
    host.trim_end_matches('/').to_string()
}
