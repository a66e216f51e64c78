//! Error types for the download module.
//!
//! [`FetchError`] describes a single failed network attempt. [`CacheError`] is
//! what a [`DownloadCache::download`](super::DownloadCache::download) call
//! returns: exhausted retries, cancellation, or a filesystem failure while
//! staging or installing bytes that were already retrieved.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors from one fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, body read, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The attempt did not complete within its timeout.
    #[error("timeout after {timeout:?} fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// Non-success HTTP response.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            timeout,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

/// Errors returned by the download cache.
///
/// Cheap to clone: a failed fetch is recorded once and handed to every caller
/// that was waiting on the same URL.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// Every fetch attempt for the URL failed.
    #[error("while downloading {url} ({attempts} attempts): {source}")]
    Fetch {
        /// The URL that could not be fetched.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// The error from the last attempt.
        #[source]
        source: Arc<FetchError>,
    },

    /// The cancellation check signalled abort.
    #[error("download cancelled")]
    Cancelled,

    /// Writing the staged copy failed.
    #[error("IO error staging {path}: {source}")]
    Stage {
        /// The staging file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Both the hard link and the copy fallback failed.
    #[error("IO error installing {path} (link failed: {link_error}): {source}")]
    Install {
        /// The destination path.
        path: PathBuf,
        /// Why the hard link was refused.
        link_error: Arc<std::io::Error>,
        /// Why the copy failed.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The staging directory could not be created.
    #[error("failed to create staging directory: {source}")]
    StagingDir {
        /// The underlying IO error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl CacheError {
    /// Creates a fetch error after the retry budget is spent.
    pub fn fetch(url: impl Into<String>, attempts: u32, source: FetchError) -> Self {
        Self::Fetch {
            url: url.into(),
            attempts,
            source: Arc::new(source),
        }
    }

    /// Creates a staging IO error.
    pub fn stage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Stage {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Creates an install error carrying both the link and the copy failure.
    pub fn install(
        path: impl Into<PathBuf>,
        link_error: std::io::Error,
        source: std::io::Error,
    ) -> Self {
        Self::Install {
            path: path.into(),
            link_error: Arc::new(link_error),
            source: Arc::new(source),
        }
    }

    /// Creates a staging-directory creation error.
    pub fn staging_dir(source: std::io::Error) -> Self {
        Self::StagingDir {
            source: Arc::new(source),
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs a url
// or path the source error does not carry, so the helper constructors above
// are the only way in.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_timeout_display() {
        let error = FetchError::timeout("https://example.com/file.iso", Duration::from_secs(7));
        let msg = error.to_string();
        assert!(msg.contains("timeout"), "Expected 'timeout' in: {msg}");
        assert!(msg.contains("7s"), "Expected timeout value in: {msg}");
        assert!(msg.contains("https://example.com/file.iso"));
    }

    #[test]
    fn test_fetch_error_http_status_display() {
        let error = FetchError::http_status("https://example.com/file.iso", 503);
        let msg = error.to_string();
        assert!(msg.contains("503"), "Expected '503' in: {msg}");
        assert!(msg.contains("https://example.com/file.iso"));
    }

    #[test]
    fn test_cache_error_fetch_display_names_url_and_cause() {
        let error = CacheError::fetch(
            "https://example.com/debian.csv",
            5,
            FetchError::http_status("https://example.com/debian.csv", 500),
        );
        let msg = error.to_string();
        assert!(msg.starts_with("while downloading https://example.com/debian.csv"));
        assert!(msg.contains("5 attempts"), "Expected attempt count in: {msg}");
        assert!(msg.contains("HTTP 500"), "Expected cause in: {msg}");
    }

    #[test]
    fn test_cache_error_clone_shares_source() {
        let error = CacheError::fetch(
            "https://example.com/a",
            5,
            FetchError::timeout("https://example.com/a", Duration::from_secs(7)),
        );
        let copy = error.clone();
        match (&error, &copy) {
            (CacheError::Fetch { source: a, .. }, CacheError::Fetch { source: b, .. }) => {
                assert!(Arc::ptr_eq(a, b));
            }
            other => panic!("Expected two Fetch errors, got {other:?}"),
        }
        assert!(std::error::Error::source(&copy).is_some());
    }

    #[test]
    fn test_cache_error_install_display() {
        let link = std::io::Error::new(std::io::ErrorKind::CrossesDevices, "cross-device link");
        let copy = std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory");
        let error = CacheError::install("/missing/dir/out.bin", link, copy);
        let msg = error.to_string();
        assert!(msg.contains("/missing/dir/out.bin"), "Expected path in: {msg}");
        assert!(msg.contains("cross-device"), "Expected link cause in: {msg}");
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(CacheError::Cancelled.to_string(), "download cancelled");
    }
}
