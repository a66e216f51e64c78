//! Deduplicating download cache.
//!
//! This module fetches remote files into a per-instance staging directory and
//! installs them at caller-chosen paths, fetching each distinct URL at most
//! once per [`DownloadCache`].
//!
//! # Features
//!
//! - Concurrent callers for the same URL share one fetch
//! - Escalating per-attempt timeouts (1s, 2s, 3s, 5s, 7s), no idle backoff
//! - Hard-link install with a metadata-preserving copy fallback
//! - Cooperative cancellation via a caller-supplied check
//! - Staging directory removed when the cache is dropped
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//! use distfetch_core::download::DownloadCache;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let abort = Arc::new(AtomicBool::new(false));
//! let cache = Arc::new(DownloadCache::new(false)?.with_abort_flag(Arc::clone(&abort)));
//!
//! let url = "https://example.com/image.qcow2";
//! let (a, b) = tokio::join!(
//!     cache.download(url, "/srv/images/a.qcow2"),
//!     cache.download(url, "/srv/images/b.qcow2"),
//! );
//! a?;
//! b?;
//! assert_eq!(cache.stats().fetches(), 1);
//! # Ok(())
//! # }
//! ```

mod cache;
mod client;
mod constants;
mod entry;
mod error;
mod install;
mod retry;
mod staging;

pub use cache::{CacheOptions, CacheStats, CancellationCheck, DownloadCache};
pub use client::{Fetcher, HttpFetcher};
pub use constants::{DEFAULT_ATTEMPT_TIMEOUTS, DEFAULT_POLL_INTERVAL, STAGING_DIR_PREFIX};
pub use entry::EntryState;
pub use error::{CacheError, FetchError};
pub use install::InstallMethod;
pub use retry::{DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error};
pub use staging::staging_filename;

// Note: no module-local Result aliases; signatures spell out
// `Result<T, CacheError>` / `Result<T, FetchError>`.
