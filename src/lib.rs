//! distfetch core library
//!
//! Fetches remote files into a per-process, deduplicated cache before
//! installing them at caller-chosen paths, and models OS distribution
//! release metadata whose Debian and Ubuntu tables are fetched through that
//! cache.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`download`] - Deduplicating download cache with escalating-timeout retries
//! - [`catalog`] - Distributions, releases and release filters

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod download;
mod user_agent;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError, Distribution, Release, ReleaseFilter};
pub use download::{
    CacheError, CacheOptions, CacheStats, DEFAULT_MAX_ATTEMPTS, DownloadCache, FailureType,
    FetchError, Fetcher, HttpFetcher, RetryDecision, RetryPolicy, classify_error,
};
