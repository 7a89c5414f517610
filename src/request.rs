use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::RummageError;
use crate::matcher::RegexMatcher;
use crate::source::WalkConfig;

/// Per-search knobs. All off by default: unlimited depth, links not
/// followed, no match limit, no deadline, batch delivery only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum depth below the root. `Some(1)` searches only the root's
    /// immediate children.
    pub max_depth: Option<usize>,

    /// Descend through symbolic links to directories. Cycles are detected
    /// and skipped as recoverable errors.
    pub follow_links: bool,

    /// Stop the walk once this many files have matched.
    pub limit: Option<usize>,

    /// Give up after this long. Counted from the moment the task starts
    /// running, not from submission. Expiry is reported as a cancellation.
    pub deadline: Option<Duration>,

    /// Call [`ResultSink::on_match`](crate::sink::ResultSink::on_match) as
    /// each match is found, in addition to the final batch.
    pub stream_matches: bool,

    /// Keep skipped-subtree errors in [`Results::errors`](crate::results::Results::errors).
    pub collect_errors: bool,
}

impl SearchOptions {
    pub(crate) fn walk_config(&self) -> WalkConfig {
        WalkConfig {
            max_depth:    self.max_depth,
            follow_links: self.follow_links,
        }
    }
}

/// One `(root, pattern)` pair to search for, plus its options.
///
/// Immutable once built. Emptiness is checked here so that blank input is
/// rejected before anything is submitted; whether the root is a directory
/// and whether the pattern compiles are checked when the task runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    root:    PathBuf,
    pattern: String,
    options: SearchOptions,
}

impl SearchRequest {
    /// # Errors
    ///
    /// [`RummageError::InvalidInput`] if either string is empty.
    pub fn new(root: impl Into<PathBuf>, pattern: impl Into<String>) -> Result<Self, RummageError> {
        let root    = root.into();
        let pattern = pattern.into();

        if root.as_os_str().is_empty() || pattern.is_empty() {
            return Err(RummageError::InvalidInput);
        }

        Ok(Self {
            root,
            pattern,
            options: SearchOptions::default(),
        })
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Check the root, then the pattern, in that order.
    ///
    /// Returns the root made absolute (relative roots resolve against the
    /// current directory; symlinks are left alone) and the compiled matcher.
    pub fn validate(&self) -> Result<(PathBuf, RegexMatcher), RummageError> {
        let root    = self.resolve_root()?;
        let matcher = RegexMatcher::new(&self.pattern)?;
        Ok((root, matcher))
    }

    fn resolve_root(&self) -> Result<PathBuf, RummageError> {
        let invalid = || RummageError::InvalidRoot(self.root.clone());

        match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(invalid()),
        }

        std::path::absolute(&self.root).map_err(|_| invalid())
    }
}
