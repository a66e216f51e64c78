//! Per-instance staging directory for fetched bodies.
//!
//! Each distinct URL is staged once under a name derived from the SHA-256 of
//! the URL string, so the same URL always maps to the same filename. Bodies
//! are written to a `.part` sibling and renamed into place; a staged path
//! that exists is always complete.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::constants::PARTIAL_SUFFIX;
use super::error::CacheError;

/// Returns the staging filename for `url`: lowercase hex SHA-256 of the URL bytes.
#[must_use]
pub fn staging_filename(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Uniquely named temporary directory, removed recursively on drop.
#[derive(Debug)]
pub(crate) struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    /// Creates a fresh directory under the system temp dir.
    pub(crate) fn create(prefix: &str) -> Result<Self, CacheError> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(CacheError::staging_dir)?;
        debug!(path = %dir.path().display(), "created staging directory");
        Ok(Self { dir })
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path a URL's body is staged at.
    pub(crate) fn path_for(&self, url: &str) -> PathBuf {
        self.dir.path().join(staging_filename(url))
    }

    /// Writes `body` for `url` and returns the final staged path.
    ///
    /// The partial file is removed if writing fails.
    pub(crate) async fn write(&self, url: &str, body: &[u8]) -> Result<PathBuf, CacheError> {
        let final_path = self.path_for(url);
        let partial_path = self
            .dir
            .path()
            .join(format!("{}{PARTIAL_SUFFIX}", staging_filename(url)));

        if let Err(error) = write_file(&partial_path, body).await {
            debug!(path = %partial_path.display(), "cleaning up partial staged file after error");
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(error);
        }

        tokio::fs::rename(&partial_path, &final_path)
            .await
            .map_err(|e| CacheError::stage(final_path.clone(), e))?;
        Ok(final_path)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        // Removal is best-effort; TempDir's own drop then finds nothing left.
        let path = self.dir.path().to_path_buf();
        if let Err(error) = std::fs::remove_dir_all(&path)
            && error.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %path.display(), error = %error, "failed to remove staging directory");
        }
    }
}

async fn write_file(path: &Path, body: &[u8]) -> Result<(), CacheError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| CacheError::stage(path, e))?;
    file.write_all(body)
        .await
        .map_err(|e| CacheError::stage(path, e))?;
    // Flush to disk before the rename publishes the file.
    file.sync_all()
        .await
        .map_err(|e| CacheError::stage(path, e))?;
    Ok(())
}
