//! Deduplicating download cache.
//!
//! [`DownloadCache`] serves `download(url, destination)` requests so that each
//! distinct URL is fetched over the network at most once per instance, no
//! matter how many tasks ask for it concurrently, and the fetched bytes are
//! installed at every requested destination.
//!
//! # Overview
//!
//! - The first caller for a URL claims it (a `Pending` entry inserted under the
//!   map's shard lock) and runs the fetch with escalating timeouts.
//! - Later callers wait on the entry's completion signal, checking the
//!   cancellation hook on every poll tick.
//! - Once `Ready`, every caller installs the staged file at its destination
//!   with a hard link, or a copy when linking is refused.
//!
//! # Example
//!
//! ```no_run
//! use distfetch_core::download::DownloadCache;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = DownloadCache::new(true)?;
//! let url = "https://debian.pages.debian.net/distro-info-data/debian.csv";
//! cache.download(url, "/tmp/debian.csv").await?;
//! // Served from the staging directory, no second request.
//! cache.download(url, "/tmp/debian-copy.csv").await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, instrument, warn};

use super::client::{Fetcher, HttpFetcher};
use super::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL, STAGING_DIR_PREFIX};
use super::entry::{CacheEntry, Claim, EntryState};
use super::error::CacheError;
use super::install::{InstallMethod, install};
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::staging::StagingDir;

/// Cancellation hook: returns `true` once the caller wants to abort.
pub type CancellationCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Construction options for [`DownloadCache`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Report progress (`downloading`, `in cache`, `done`) at info level instead of debug.
    pub verbose: bool,
    /// Per-attempt timeout ladder.
    pub retry_policy: RetryPolicy,
    /// How often a waiting caller re-checks cancellation.
    pub poll_interval: Duration,
    /// Prefix of the staging directory name.
    pub staging_prefix: String,
    /// Connect timeout of the default HTTP fetcher.
    pub connect_timeout: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            retry_policy: RetryPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            staging_prefix: STAGING_DIR_PREFIX.to_string(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Counters describing what a cache instance has done.
///
/// Atomic so concurrent `download` calls can update them without locking.
#[derive(Debug, Default)]
pub struct CacheStats {
    fetches: AtomicUsize,
    attempts: AtomicUsize,
    retried: AtomicUsize,
    hits: AtomicUsize,
    linked: AtomicUsize,
    copied: AtomicUsize,
}

impl CacheStats {
    /// Number of URLs this instance claimed and fetched (successfully or not).
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of calls made to the fetch primitive, retries included.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of retry attempts made.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    /// Number of calls served by another caller's fetch.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Number of destinations installed with a hard link.
    #[must_use]
    pub fn linked(&self) -> usize {
        self.linked.load(Ordering::SeqCst)
    }

    /// Number of destinations installed with a copy.
    #[must_use]
    pub fn copied(&self) -> usize {
        self.copied.load(Ordering::SeqCst)
    }

    fn increment(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// What `claim` found for a URL.
enum Slot {
    /// This caller now owns the fetch.
    Owner(Claim),
    /// Someone else owns it (or it is already `Ready`).
    Existing(Arc<CacheEntry>),
}

/// Per-process download cache with one staging directory per instance.
///
/// `DownloadCache` is `Send + Sync`; share one instance behind an `Arc`
/// across tasks. Instances are fully independent of each other.
///
/// # Concurrency Model
///
/// - Claiming a URL is an insert-if-absent on a `DashMap` shard; no lock is
///   held across an await, so fetches of different URLs never serialize
/// - Each entry carries a `watch` channel; waiters wake on the single
///   transition out of `Pending`
/// - A failed fetch is delivered to every waiter; the next request for that
///   URL claims it again
///
/// # Lifecycle
///
/// The staging directory is created in the constructor and removed when the
/// cache is dropped.
pub struct DownloadCache {
    options: CacheOptions,
    fetcher: Arc<dyn Fetcher>,
    entries: DashMap<String, Arc<CacheEntry>>,
    cancellation: CancellationCheck,
    stats: CacheStats,
    staging: StagingDir,
}

impl fmt::Debug for DownloadCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadCache")
            .field("options", &self.options)
            .field("fetcher", &self.fetcher)
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .field("staging", &self.staging.path())
            .finish_non_exhaustive()
    }
}

impl DownloadCache {
    /// Creates a cache backed by the default HTTP fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::StagingDir`] if the staging directory cannot be
    /// created.
    pub fn new(verbose: bool) -> Result<Self, CacheError> {
        Self::from_options(CacheOptions {
            verbose,
            ..CacheOptions::default()
        })
    }

    /// Creates a cache with explicit options and the default HTTP fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::StagingDir`] if the staging directory cannot be
    /// created.
    pub fn from_options(options: CacheOptions) -> Result<Self, CacheError> {
        let fetcher = Arc::new(HttpFetcher::with_connect_timeout(options.connect_timeout));
        Self::with_options(options, fetcher)
    }

    /// Creates a cache with explicit options and fetch primitive.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::StagingDir`] if the staging directory cannot be
    /// created.
    #[instrument(level = "debug", skip_all, fields(verbose = options.verbose))]
    pub fn with_options(
        options: CacheOptions,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, CacheError> {
        let staging = StagingDir::create(&options.staging_prefix)?;
        Ok(Self {
            options,
            fetcher,
            entries: DashMap::new(),
            cancellation: Arc::new(|| false),
            stats: CacheStats::default(),
            staging,
        })
    }

    /// Installs a cancellation hook, consulted on call entry, on every wait
    /// tick and before every retry.
    #[must_use]
    pub fn with_cancellation(mut self, check: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.cancellation = Arc::new(check);
        self
    }

    /// Cancels once `flag` is set (e.g. by a Ctrl-C handler).
    #[must_use]
    pub fn with_abort_flag(self, flag: Arc<AtomicBool>) -> Self {
        self.with_cancellation(move || flag.load(Ordering::SeqCst))
    }

    /// Path of this instance's staging directory.
    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    /// Staged path of `url` if it has been fetched.
    #[must_use]
    pub fn staged_path(&self, url: &str) -> Option<PathBuf> {
        match self.entry_state(url)? {
            EntryState::Ready(path) => Some(path),
            _ => None,
        }
    }

    /// Current state of `url`, if it was ever requested.
    #[must_use]
    pub fn entry_state(&self, url: &str) -> Option<EntryState> {
        self.entries.get(url).map(|entry| entry.state())
    }

    /// Number of distinct URLs requested so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no URL was requested yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counters for this instance.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Fetches `url` (at most once per instance) and installs its bytes at `destination`.
    ///
    /// The parent directory of `destination` must exist. On error the
    /// destination's content is unspecified; a fetch failure never creates it.
    ///
    /// # Errors
    ///
    /// - [`CacheError::Cancelled`] if the cancellation hook fired
    /// - [`CacheError::Fetch`] if every attempt failed, for this caller or the
    ///   caller whose fetch this one was waiting on
    /// - [`CacheError::Stage`] if the body could not be written to staging
    /// - [`CacheError::Install`] if both hard link and copy failed
    #[instrument(skip(self, destination), fields(url = %url, destination = %destination.as_ref().display()))]
    pub async fn download(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
    ) -> Result<(), CacheError> {
        self.check_cancelled()?;
        let staged = self.resolve(url).await?;

        match install(&staged, destination.as_ref()).await? {
            InstallMethod::Linked => CacheStats::increment(&self.stats.linked),
            InstallMethod::Copied => CacheStats::increment(&self.stats.copied),
            InstallMethod::AlreadyInstalled => {}
        }
        Ok(())
    }

    /// Returns the staged path for `url`, fetching or waiting as needed.
    async fn resolve(&self, url: &str) -> Result<PathBuf, CacheError> {
        loop {
            match self.claim(url) {
                Slot::Owner(claim) => return self.fetch_and_stage(url, claim).await,
                Slot::Existing(entry) => {
                    if let Some(path) = self.wait(url, &entry).await? {
                        return Ok(path);
                    }
                    debug!(url, "previous owner abandoned the fetch, claiming");
                }
            }
        }
    }

    /// Atomically claims `url` unless it is pending or ready.
    fn claim(&self, url: &str) -> Slot {
        // The shard lock is held only for this match.
        match self.entries.entry(url.to_string()) {
            Entry::Vacant(vacant) => {
                let entry = CacheEntry::pending();
                vacant.insert(Arc::clone(&entry));
                Slot::Owner(Claim::new(url, entry))
            }
            Entry::Occupied(mut occupied) => {
                if occupied.get().state().is_reclaimable() {
                    let entry = CacheEntry::pending();
                    occupied.insert(Arc::clone(&entry));
                    Slot::Owner(Claim::new(url, entry))
                } else {
                    Slot::Existing(Arc::clone(occupied.get()))
                }
            }
        }
    }

    /// Waits until `entry` leaves `Pending`. `Ok(None)` means it was abandoned.
    async fn wait(&self, url: &str, entry: &CacheEntry) -> Result<Option<PathBuf>, CacheError> {
        let mut state = entry.subscribe();
        loop {
            let current = state.borrow_and_update().clone();
            match current {
                EntryState::Ready(path) => {
                    self.progress(url, "in cache");
                    CacheStats::increment(&self.stats.hits);
                    return Ok(Some(path));
                }
                EntryState::Failed(error) => return Err(error),
                EntryState::Abandoned => return Ok(None),
                EntryState::Pending => {}
            }

            tokio::select! {
                changed = state.changed() => {
                    if changed.is_err() {
                        return Ok(None);
                    }
                }
                () = tokio::time::sleep(self.options.poll_interval) => {}
            }
            self.check_cancelled()?;
        }
    }

    async fn fetch_and_stage(&self, url: &str, claim: Claim) -> Result<PathBuf, CacheError> {
        CacheStats::increment(&self.stats.fetches);
        self.progress(url, "downloading");

        let result = match self.fetch_with_retry(url).await {
            Ok(body) => self.staging.write(url, &body).await,
            Err(error) => Err(error),
        };

        match result {
            Ok(path) => {
                claim.ready(path.clone());
                self.progress(url, "done");
                Ok(path)
            }
            // Dropping the claim marks the entry abandoned; waiters take over.
            Err(CacheError::Cancelled) => Err(CacheError::Cancelled),
            Err(error) => {
                claim.failed(error.clone());
                Err(error)
            }
        }
    }

    /// Runs the escalating-timeout attempt loop.
    async fn fetch_with_retry(&self, url: &str) -> Result<Vec<u8>, CacheError> {
        let policy = &self.options.retry_policy;
        let mut attempt = 1;
        let mut timeout = policy.first_timeout();

        loop {
            CacheStats::increment(&self.stats.attempts);
            let error = match self.fetcher.fetch(url, timeout).await {
                Ok(body) => {
                    debug!(url, attempt, bytes = body.len(), "fetch succeeded");
                    return Ok(body);
                }
                Err(error) => error,
            };

            match policy.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    timeout: next_timeout,
                    attempt: next_attempt,
                } => {
                    debug!(url, attempt, error = %error, "attempt failed, retrying");
                    CacheStats::increment(&self.stats.retried);
                    self.check_cancelled()?;
                    timeout = next_timeout;
                    attempt = next_attempt;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(url, attempt, error = %error, reason = %reason, "giving up");
                    return Err(CacheError::fetch(url, attempt, error));
                }
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), CacheError> {
        if (self.cancellation)() {
            debug!("cancellation requested");
            return Err(CacheError::Cancelled);
        }
        Ok(())
    }

    fn progress(&self, url: &str, stage: &str) {
        if self.options.verbose {
            info!(url, "{stage}");
        } else {
            debug!(url, "{stage}");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::download::FetchError;

    /// Scripted fetcher: per-URL queue of outcomes, counting calls.
    #[derive(Debug, Default)]
    struct ScriptedFetcher {
        script: Mutex<HashMap<String, Vec<Result<Vec<u8>, u16>>>>,
        calls: AtomicUsize,
        timeouts_seen: Mutex<Vec<Duration>>,
        delay: Duration,
    }

    impl ScriptedFetcher {
        fn with(url: &str, outcomes: Vec<Result<Vec<u8>, u16>>) -> Self {
            let fetcher = Self::default();
            fetcher
                .script
                .lock()
                .unwrap()
                .insert(url.to_string(), outcomes);
            fetcher
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.timeouts_seen.lock().unwrap().push(timeout);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = {
                let mut script = self.script.lock().unwrap();
                let outcomes = script.get_mut(url).unwrap();
                if outcomes.len() > 1 {
                    outcomes.remove(0)
                } else {
                    outcomes[0].clone()
                }
            };
            next.map_err(|status| FetchError::http_status(url, status))
        }
    }

    fn fast_options() -> CacheOptions {
        CacheOptions {
            retry_policy: RetryPolicy::new(vec![Duration::from_millis(10); 5]),
            poll_interval: Duration::from_millis(1),
            ..CacheOptions::default()
        }
    }

    const URL: &str = "https://example.com/debian.csv";

    #[tokio::test]
    async fn test_download_uses_default_ladder_in_order() {
        let fetcher = Arc::new(ScriptedFetcher::with(
            URL,
            vec![Err(503), Err(503), Err(503), Err(503), Ok(b"ok".to_vec())],
        ));
        let cache = DownloadCache::with_options(CacheOptions::default(), fetcher.clone()).unwrap();
        let dir = TempDir::new().unwrap();

        cache.download(URL, dir.path().join("out")).await.unwrap();

        let secs: Vec<u64> = fetcher
            .timeouts_seen
            .lock()
            .unwrap()
            .iter()
            .map(Duration::as_secs)
            .collect();
        assert_eq!(secs, vec![1, 2, 3, 5, 7]);
        assert_eq!(cache.stats().retried(), 4);
    }

    #[tokio::test]
    async fn test_failed_entry_is_reclaimed_by_next_request() {
        let fetcher = Arc::new(ScriptedFetcher::with(
            URL,
            vec![
                Err(500),
                Err(500),
                Err(500),
                Err(500),
                Err(500),
                Ok(b"second time lucky".to_vec()),
            ],
        ));
        let cache = DownloadCache::with_options(fast_options(), fetcher.clone()).unwrap();
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out");

        let first = cache.download(URL, &dest).await;
        assert!(matches!(first, Err(CacheError::Fetch { attempts: 5, .. })));
        assert!(matches!(cache.entry_state(URL), Some(EntryState::Failed(_))));
        assert!(!dest.exists());

        cache.download(URL, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"second time lucky");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 6);
        assert_eq!(cache.stats().fetches(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_waiters_receive_owner_failure() {
        let fetcher = Arc::new(ScriptedFetcher {
            delay: Duration::from_millis(50),
            ..ScriptedFetcher::with(URL, vec![Err(502)])
        });
        let cache = Arc::new(DownloadCache::with_options(fast_options(), fetcher.clone()).unwrap());
        let dir = TempDir::new().unwrap();

        let mut handles = Vec::new();
        for i in 0..4 {
            let cache = Arc::clone(&cache);
            let dest = dir.path().join(format!("out-{i}"));
            handles.push(tokio::spawn(async move { cache.download(URL, dest).await }));
        }
        for handle in handles {
            let result = handle.await.unwrap();
            assert!(
                matches!(result, Err(CacheError::Fetch { .. })),
                "every caller sees the fetch error: {result:?}"
            );
        }
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 5);
        assert_eq!(cache.stats().fetches(), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_retried() {
        #[derive(Debug)]
        struct Rejecting(AtomicUsize);

        #[async_trait]
        impl Fetcher for Rejecting {
            async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, FetchError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::invalid_url(url))
            }
        }

        let fetcher = Arc::new(Rejecting(AtomicUsize::new(0)));
        let cache = DownloadCache::with_options(fast_options(), fetcher.clone()).unwrap();
        let dir = TempDir::new().unwrap();

        let result = cache.download("nonsense", dir.path().join("out")).await;
        assert!(matches!(result, Err(CacheError::Fetch { attempts: 1, .. })));
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_between_retries_abandons_entry() {
        let fetcher = Arc::new(ScriptedFetcher::with(URL, vec![Err(503), Ok(b"x".to_vec())]));
        let checks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&checks);
        // The check on call entry passes; the one before the first retry cancels.
        let cache = DownloadCache::with_options(fast_options(), fetcher.clone())
            .unwrap()
            .with_cancellation(move || counter.fetch_add(1, Ordering::SeqCst) >= 1);
        let dir = TempDir::new().unwrap();

        let result = cache.download(URL, dir.path().join("out")).await;
        assert!(matches!(result, Err(CacheError::Cancelled)));
        assert!(matches!(cache.entry_state(URL), Some(EntryState::Abandoned)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(checks.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_staged_path_only_when_ready() {
        let fetcher = Arc::new(ScriptedFetcher::with(URL, vec![Ok(b"staged".to_vec())]));
        let cache = DownloadCache::with_options(fast_options(), fetcher).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.staged_path(URL), None);

        let dir = TempDir::new().unwrap();
        cache.download(URL, dir.path().join("out")).await.unwrap();

        let staged = cache.staged_path(URL).unwrap();
        assert!(staged.starts_with(cache.staging_dir()));
        assert_eq!(
            staged.file_name().unwrap().to_string_lossy(),
            crate::download::staging_filename(URL)
        );
        assert_eq!(std::fs::read(staged).unwrap(), b"staged");
    }
}
