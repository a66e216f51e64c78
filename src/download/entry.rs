//! Per-URL cache entries and the claim that owns an in-flight fetch.
//!
//! An entry is a `watch` channel holding [`EntryState`]. The first caller for
//! a URL claims the entry and is the only one that fetches; everyone else
//! subscribes and is woken by the single transition out of `Pending`.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::error::CacheError;

/// Resolution state of one URL.
#[derive(Debug, Clone)]
pub enum EntryState {
    /// A fetch is in flight; no path yet.
    Pending,
    /// Bytes are staged at this path. Final.
    Ready(PathBuf),
    /// The claiming fetch failed; waiters receive this error.
    Failed(CacheError),
    /// The claiming caller went away without an outcome.
    Abandoned,
}

impl EntryState {
    /// Whether the next request for the URL should claim it again.
    pub(crate) fn is_reclaimable(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Abandoned)
    }
}

/// Cache entry for one URL.
#[derive(Debug)]
pub(crate) struct CacheEntry {
    state: watch::Sender<EntryState>,
}

impl CacheEntry {
    pub(crate) fn pending() -> Arc<Self> {
        let (state, _) = watch::channel(EntryState::Pending);
        Arc::new(Self { state })
    }

    pub(crate) fn state(&self) -> EntryState {
        self.state.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<EntryState> {
        self.state.subscribe()
    }

    /// Records an outcome. `send_replace` stores it even with no subscriber.
    fn resolve(&self, state: EntryState) {
        self.state.send_replace(state);
    }
}

/// Ownership of a claimed entry.
///
/// Dropping a claim without calling [`Claim::ready`] or [`Claim::failed`]
/// (a cancelled or panicking owner) marks the entry abandoned so waiters
/// re-claim instead of waiting forever.
#[derive(Debug)]
pub(crate) struct Claim {
    url: String,
    entry: Arc<CacheEntry>,
    resolved: bool,
}

impl Claim {
    pub(crate) fn new(url: &str, entry: Arc<CacheEntry>) -> Self {
        Self {
            url: url.to_string(),
            entry,
            resolved: false,
        }
    }

    pub(crate) fn ready(mut self, path: PathBuf) {
        self.resolved = true;
        self.entry.resolve(EntryState::Ready(path));
    }

    pub(crate) fn failed(mut self, error: CacheError) {
        self.resolved = true;
        self.entry.resolve(EntryState::Failed(error));
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        if !self.resolved {
            debug!(url = %self.url, "claim dropped before completion");
            self.entry.resolve(EntryState::Abandoned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_pending() {
        let entry = CacheEntry::pending();
        assert!(matches!(entry.state(), EntryState::Pending));
        assert!(!entry.state().is_reclaimable());
    }

    #[test]
    fn test_ready_claim_publishes_path() {
        let entry = CacheEntry::pending();
        let mut rx = entry.subscribe();
        Claim::new("https://example.com/a", Arc::clone(&entry)).ready(PathBuf::from("/stage/a"));

        assert!(rx.has_changed().unwrap_or(false));
        match &*rx.borrow_and_update() {
            EntryState::Ready(path) => assert_eq!(path, &PathBuf::from("/stage/a")),
            other => panic!("Expected Ready, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_claim_is_reclaimable() {
        let entry = CacheEntry::pending();
        Claim::new("https://example.com/a", Arc::clone(&entry))
            .failed(CacheError::Cancelled);
        assert!(entry.state().is_reclaimable());
    }

    #[test]
    fn test_dropped_claim_marks_abandoned() {
        let entry = CacheEntry::pending();
        {
            let _claim = Claim::new("https://example.com/a", Arc::clone(&entry));
        }
        assert!(matches!(entry.state(), EntryState::Abandoned));
    }
}
