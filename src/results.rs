use std::path::PathBuf;
use std::time::Duration;

use crate::error::RummageError;

/// The output of a completed search.
///
/// Handed to [`ResultSink::on_completed`](crate::sink::ResultSink::on_completed)
/// by value. The running task is its only owner until then, so nothing else
/// ever observes a half-built list.
#[derive(Debug, Default)]
pub struct Results {
    /// Number of matched files. Equals `paths.len()`.
    pub matches: usize,

    /// Absolute paths of matched files, in the order they were found.
    /// Not sorted; two runs over the same tree may differ in order.
    pub paths: Vec<PathBuf>,

    /// `true` when the walk stopped early because the configured
    /// [`limit`](crate::request::SearchOptions::limit) was hit.
    pub limit_reached: bool,

    /// Scan performance statistics.
    pub stats: ScanStats,

    /// Subtrees that were skipped (permission denied, vanished, loops).
    /// Only populated if `collect_errors` was set on the request.
    pub errors: Vec<RummageError>,
}

impl Results {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Performance statistics for a completed scan.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanStats {
    /// Total number of files encountered (matched or not).
    pub files: usize,

    /// Total number of directories encountered, excluding the root.
    pub dirs: usize,

    /// Wall-clock time from walk start to completion.
    pub duration: Duration,

    /// Total entries scanned per second. Equals
    /// `(files + dirs) / duration.as_secs_f64()`, clamped to 0 on
    /// zero-duration runs.
    pub entries_per_sec: usize,
}

impl ScanStats {
    /// Compute `entries_per_sec` from raw counts and duration.
    pub(crate) fn compute(files: usize, dirs: usize, duration: Duration) -> Self {
        let total = files + dirs;
        let eps = if duration.as_secs_f64() > 0.0 {
            (total as f64 / duration.as_secs_f64()) as usize
        } else {
            0
        };
        Self {
            files,
            dirs,
            duration,
            entries_per_sec: eps,
        }
    }
}
