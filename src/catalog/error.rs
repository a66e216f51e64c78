//! Error types for catalog loading.

use std::path::PathBuf;

use thiserror::Error;

use crate::download::CacheError;

/// Errors that can occur while building the release catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The release table could not be downloaded.
    #[error("failed to download release table for {distribution}: {source}")]
    Download {
        /// Distribution id whose table was requested
        distribution: String,
        /// Underlying cache error
        #[source]
        source: CacheError,
    },

    /// The downloaded table could not be read back.
    #[error("failed to read release table {path}: {source}")]
    Read {
        /// Installed table path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A row of the table is malformed.
    #[error("{distribution}.csv line {line}: {reason}")]
    Parse {
        /// Distribution id of the table
        distribution: String,
        /// 1-indexed line number, header included
        line: usize,
        /// What is wrong with the row
        reason: String,
    },
}

impl CatalogError {
    /// Creates a `Download` error.
    #[must_use]
    pub fn download(distribution: &str, source: CacheError) -> Self {
        Self::Download {
            distribution: distribution.to_string(),
            source,
        }
    }

    /// Creates a `Read` error.
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a `Parse` error.
    #[must_use]
    pub fn parse(distribution: &str, line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            distribution: distribution.to_string(),
            line,
            reason: reason.into(),
        }
    }
}
