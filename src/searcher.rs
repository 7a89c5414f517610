use std::path::PathBuf;
use std::sync::Arc;

use crate::error::RummageError;
use crate::pool::WorkerPool;
use crate::request::{SearchOptions, SearchRequest};
use crate::sink::ResultSink;
use crate::task::{Generation, TaskHandle};

/// The start/cancel surface a front end drives.
///
/// Owns a [`WorkerPool`] and the sink every search reports to. A search
/// button maps to [`start_search`](Searcher::start_search), a cancel button to
/// [`cancel`](Searcher::cancel).
///
/// ```rust,no_run
/// use rummage::{ChannelSink, SearchEvent, Searcher};
///
/// let (sink, events) = ChannelSink::new();
/// let searcher = Searcher::new(5, sink)?;
/// searcher.start_search("/var/log", r".*\.log")?;
///
/// for event in events.iter() {
///     if let SearchEvent::Completed(_, results) = event {
///         println!("{} match(es)", results.matches);
///         break;
///     }
/// }
/// # Ok::<(), rummage::RummageError>(())
/// ```
pub struct Searcher {
    pool:    WorkerPool,
    sink:    Arc<dyn ResultSink>,
    options: SearchOptions,
}

impl Searcher {
    /// Start a pool of `capacity` workers reporting to `sink`.
    pub fn new(capacity: usize, sink: impl ResultSink + 'static) -> Result<Self, RummageError> {
        Ok(Self::with_pool(WorkerPool::new(capacity)?, Arc::new(sink)))
    }

    pub fn with_pool(pool: WorkerPool, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            pool,
            sink,
            options: SearchOptions::default(),
        }
    }

    /// Options applied to every search started with
    /// [`start_search`](Searcher::start_search).
    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    /// Queue a search of `path` for files whose names fully match `pattern`.
    ///
    /// # Errors
    ///
    /// [`RummageError::InvalidInput`] if either string is empty; the pool is
    /// not touched. A missing root or malformed pattern is not an error
    /// here: the task fails and reports through the sink's `on_error`.
    pub fn start_search(
        &self,
        path:    impl Into<PathBuf>,
        pattern: impl Into<String>,
    ) -> Result<TaskHandle, RummageError> {
        let request = SearchRequest::new(path, pattern)?.with_options(self.options.clone());
        self.start_search_with(request)
    }

    /// Queue a fully-built request, ignoring the searcher's default options.
    pub fn start_search_with(&self, request: SearchRequest) -> Result<TaskHandle, RummageError> {
        self.pool.submit(request, Arc::clone(&self.sink))
    }

    /// Cancel everything in flight. The searcher is immediately usable again.
    pub fn cancel(&self) -> Generation {
        self.pool.cancel_all()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Let queued searches finish, then stop the workers.
    pub fn shutdown(self) {
        self.pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::sink::ChannelSink;

    #[test]
    fn empty_input_never_reaches_the_pool() {
        let (sink, events) = ChannelSink::new();
        let searcher = Searcher::new(1, sink).unwrap();

        assert!(matches!(searcher.start_search("", ".*"), Err(RummageError::InvalidInput)));
        assert!(matches!(searcher.start_search("/tmp", ""), Err(RummageError::InvalidInput)));
        assert_eq!(searcher.pool().queued_count(), 0);
        assert_eq!(searcher.pool().generation(), Generation::default());

        searcher.shutdown();
        assert!(events.try_recv().is_err(), "no task was created");
    }
}
