//! Constants for the download module (timeouts, polling, staging).

use std::time::Duration;

/// Per-attempt timeouts, in order. The list length is the attempt budget.
pub const DEFAULT_ATTEMPT_TIMEOUTS: [Duration; 5] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(3),
    Duration::from_secs(5),
    Duration::from_secs(7),
];

/// Interval between cancellation checks while waiting on another caller's fetch.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default HTTP connect timeout (30 seconds).
///
/// Per-attempt timeouts bound the whole request, so this only caps the
/// connect phase when an attempt timeout is longer.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Prefix of the per-instance staging directory name.
pub const STAGING_DIR_PREFIX: &str = "DOWNLOAD_DIR.";

/// Suffix of a staged file while its body is still being written.
pub const PARTIAL_SUFFIX: &str = ".part";
