use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::RummageError;
use crate::pool::WorkerPool;
use crate::request::{SearchOptions, SearchRequest};
use crate::results::Results;
use crate::sink::ResultSink;
use crate::task::{self, CancelToken, Halt, TaskHandle};

// ---------------------------------------------------------------------------
// SearchBuilder
// ---------------------------------------------------------------------------

/// Fluent configuration for a single search.
///
/// Created via [`rummage::search()`](crate::search). Configure with chained
/// builder methods, then either [`run()`](SearchBuilder::run) it on the
/// current thread or [`submit()`](SearchBuilder::submit) it to a pool.
///
/// # Example
///
/// ```rust,ignore
/// let results = rummage::search()
///     .root("/var/log")
///     .pattern(r".*\.log")
///     .max_depth(3)
///     .limit(100)
///     .run()?;
/// ```
#[derive(Debug, Default, Clone)]
pub struct SearchBuilder {
    root:    Option<PathBuf>,
    pattern: Option<String>,
    options: SearchOptions,
}

impl SearchBuilder {
    // ── Input ─────────────────────────────────────────────────────────────

    /// Directory to search under. Relative paths resolve against the
    /// current directory when the search runs.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Regular expression the whole file name must match.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    // ── Options ───────────────────────────────────────────────────────────

    /// Maximum traversal depth below the root. `1` means the root's
    /// immediate children only. Unlimited by default.
    pub fn max_depth(mut self, d: usize) -> Self {
        self.options.max_depth = Some(d);
        self
    }

    /// Descend through symbolic links. Off by default.
    pub fn follow_links(mut self, yes: bool) -> Self {
        self.options.follow_links = yes;
        self
    }

    /// Stop after `n` matches.
    pub fn limit(mut self, n: usize) -> Self {
        self.options.limit = Some(n);
        self
    }

    /// Give up if the walk takes longer than `d`.
    pub fn deadline(mut self, d: Duration) -> Self {
        self.options.deadline = Some(d);
        self
    }

    /// Report matches to the sink as they are found, not only at the end.
    /// Only affects [`submit()`](SearchBuilder::submit); `run_with` always
    /// streams to its callback.
    pub fn stream_matches(mut self, yes: bool) -> Self {
        self.options.stream_matches = yes;
        self
    }

    /// Collect skipped-subtree errors into [`Results::errors`].
    ///
    /// Disabled by default; unreadable directories are then skipped silently.
    pub fn collect_errors(mut self, yes: bool) -> Self {
        self.options.collect_errors = yes;
        self
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// The configured request, without running it.
    ///
    /// # Errors
    ///
    /// [`RummageError::InvalidInput`] if the root or pattern is missing or empty.
    pub fn request(self) -> Result<SearchRequest, RummageError> {
        let root    = self.root.unwrap_or_default();
        let pattern = self.pattern.unwrap_or_default();
        Ok(SearchRequest::new(root, pattern)?.with_options(self.options))
    }

    /// Execute the search on the current thread and return results.
    ///
    /// Blocks until the walk completes. For concurrent searches and
    /// cancellation, [`submit()`](SearchBuilder::submit) to a [`WorkerPool`].
    ///
    /// # Errors
    ///
    /// Input, root and pattern errors; [`RummageError::Cancelled`] if the
    /// deadline expired. Unreadable subtrees are not errors; see
    /// [`collect_errors()`](SearchBuilder::collect_errors).
    pub fn run(self) -> Result<Results, RummageError> {
        self.run_with(|_| {})
    }

    /// Like [`run()`](SearchBuilder::run), calling `on_match` for each match
    /// as it is found.
    pub fn run_with<F>(self, on_match: F) -> Result<Results, RummageError>
    where
        F: FnMut(&Path),
    {
        let request = self.request()?;
        let token   = CancelToken::new();
        token.start();

        task::execute(&request, &token, on_match).map_err(|halt| match halt {
            Halt::Cancelled(_) => RummageError::Cancelled,
            Halt::Failed(err)  => err,
        })
    }

    /// Queue the search on `pool`, reporting to `sink`.
    pub fn submit(self, pool: &WorkerPool, sink: Arc<dyn ResultSink>) -> Result<TaskHandle, RummageError> {
        pool.submit(self.request()?, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_pieces_are_invalid_input() {
        assert!(matches!(SearchBuilder::default().pattern(".*").request(), Err(RummageError::InvalidInput)));
        assert!(matches!(SearchBuilder::default().root("/").request(), Err(RummageError::InvalidInput)));
    }

    #[test]
    fn options_reach_the_request() {
        let req = SearchBuilder::default()
            .root("/data")
            .pattern(r".*\.csv")
            .max_depth(2)
            .limit(7)
            .follow_links(true)
            .collect_errors(true)
            .request()
            .unwrap();

        assert_eq!(req.root(), Path::new("/data"));
        assert_eq!(req.pattern(), r".*\.csv");
        assert_eq!(req.options().max_depth, Some(2));
        assert_eq!(req.options().limit, Some(7));
        assert!(req.options().follow_links);
        assert!(req.options().collect_errors);
        assert!(!req.options().stream_matches);
    }

    #[test]
    fn run_with_streams_every_match() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("one.md"), "").unwrap();
        fs::write(dir.path().join("two.md"), "").unwrap();

        let mut seen = Vec::new();
        let results = SearchBuilder::default()
            .root(dir.path())
            .pattern(r".*\.md")
            .run_with(|p| seen.push(p.to_path_buf()))
            .unwrap();

        assert_eq!(seen, results.paths);
        assert_eq!(results.matches, 2);
    }

    #[test]
    fn deadline_surfaces_as_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f"), "").unwrap();

        let err = SearchBuilder::default()
            .root(dir.path())
            .pattern(".*")
            .deadline(Duration::ZERO)
            .run()
            .unwrap_err();
        assert!(matches!(err, RummageError::Cancelled));
    }
}
