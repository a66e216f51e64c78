//! Install step: make a staged file appear at a destination path.
//!
//! A hard link is tried first. Any link failure (cross-device, existing
//! destination, unsupported filesystem, permissions) falls back to a full copy
//! that keeps the staged file's permissions and access/modification times.
//! The copy is renamed over the destination, so an existing destination
//! inode is replaced and never written to.

use std::fs::FileTimes;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::constants::PARTIAL_SUFFIX;
use super::error::CacheError;

/// How the bytes reached the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMethod {
    /// The destination is a hard link to the staged file.
    Linked,
    /// The destination is an independent copy.
    Copied,
    /// The destination already was the staged file.
    AlreadyInstalled,
}

/// Installs `staged` at `destination`.
///
/// The parent directory of `destination` must exist.
pub(crate) async fn install(staged: &Path, destination: &Path) -> Result<InstallMethod, CacheError> {
    let link_error = match tokio::fs::hard_link(staged, destination).await {
        Ok(()) => return Ok(InstallMethod::Linked),
        Err(error) => error,
    };

    // Copying a file onto a link of itself would truncate the staged copy.
    if is_same_file(staged, destination).await {
        return Ok(InstallMethod::AlreadyInstalled);
    }

    debug!(
        staged = %staged.display(),
        destination = %destination.display(),
        error = %link_error,
        "hard link refused, copying"
    );
    match copy_with_metadata(staged.to_path_buf(), destination.to_path_buf()).await {
        Ok(()) => Ok(InstallMethod::Copied),
        Err(source) => Err(CacheError::install(destination, link_error, source)),
    }
}

async fn copy_with_metadata(staged: PathBuf, destination: PathBuf) -> std::io::Result<()> {
    tokio::task::spawn_blocking(move || replace_with_copy(&staged, &destination))
        .await
        .map_err(std::io::Error::other)?
}

/// Copies `staged` to a fresh file next to `destination`, then renames it
/// into place. The old destination inode is never written to, since it may
/// be a hard link to another staged file.
fn replace_with_copy(staged: &Path, destination: &Path) -> std::io::Result<()> {
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = tempfile::Builder::new()
        .prefix(".distfetch-")
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(parent)?;

    // fs::copy carries permission bits; timestamps are set afterwards.
    std::fs::copy(staged, temp.path())?;
    let metadata = std::fs::metadata(staged)?;
    let times = FileTimes::new()
        .set_accessed(metadata.accessed()?)
        .set_modified(metadata.modified()?);
    std::fs::OpenOptions::new()
        .write(true)
        .open(temp.path())?
        .set_times(times)?;

    temp.persist(destination).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(unix)]
async fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (tokio::fs::metadata(a).await, tokio::fs::metadata(b).await) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
async fn is_same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
