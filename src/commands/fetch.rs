//! Fetch command handler: download URL/destination pairs through one cache.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use distfetch_core::{CacheOptions, DownloadCache, RetryPolicy};
use futures_util::future::join_all;
use tracing::{error, info};

use crate::cli::FetchArgs;

/// Builds cache options from the command line.
pub(crate) fn cache_options(args: &FetchArgs, verbose: bool) -> CacheOptions {
    let mut options = CacheOptions {
        verbose,
        ..CacheOptions::default()
    };
    if !args.timeouts.is_empty() {
        let ladder = args.timeouts.iter().copied().map(Duration::from_millis).collect();
        options.retry_policy = RetryPolicy::new(ladder);
    }
    options
}

pub async fn run_fetch_command(
    args: &FetchArgs,
    verbose: bool,
    interrupted: Arc<AtomicBool>,
) -> Result<()> {
    let downloads = args.downloads().map_err(|e| anyhow!(e))?;
    let cache = DownloadCache::from_options(cache_options(args, verbose))?
        .with_abort_flag(interrupted);

    // All pairs run concurrently; pairs sharing a URL share one fetch.
    let results = join_all(
        downloads
            .iter()
            .map(|(url, destination)| cache.download(url, destination)),
    )
    .await;

    let mut failed = 0usize;
    for ((url, destination), result) in downloads.iter().zip(results) {
        match result {
            Ok(()) => info!(url = %url, destination = %destination.display(), "installed"),
            Err(e) => {
                failed += 1;
                error!(url = %url, destination = %destination.display(), error = %e, "download failed");
            }
        }
    }

    let stats = cache.stats();
    info!(
        requested = downloads.len(),
        fetched = stats.fetches(),
        attempts = stats.attempts(),
        retried = stats.retried(),
        hits = stats.hits(),
        linked = stats.linked(),
        copied = stats.copied(),
        "Fetch complete"
    );

    if failed > 0 {
        bail!("{failed} of {} downloads failed", downloads.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Args, Command};

    fn parse(argv: &[&str]) -> FetchArgs {
        match Args::try_parse_from(argv).unwrap().command {
            Command::Fetch(fetch) => fetch,
            other => panic!("Expected fetch, got: {other:?}"),
        }
    }

    #[test]
    fn test_cache_options_default_ladder() {
        let args = parse(&["distfetch", "fetch", "https://example.com/a", "/tmp/a"]);
        let options = cache_options(&args, true);
        assert!(options.verbose);
        assert_eq!(options.retry_policy, RetryPolicy::default());
    }

    #[test]
    fn test_cache_options_custom_ladder() {
        let args = parse(&[
            "distfetch",
            "fetch",
            "--timeouts",
            "50,150",
            "https://example.com/a",
            "/tmp/a",
        ]);
        let options = cache_options(&args, false);
        assert_eq!(
            options.retry_policy.timeouts(),
            &[Duration::from_millis(50), Duration::from_millis(150)]
        );
        assert_eq!(options.retry_policy.max_attempts(), 2);
    }
}
