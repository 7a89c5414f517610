//! # rummage
//!
//! Concurrent, cancellable file-name search over directory trees.
//!
//! rummage walks a directory tree depth-first and reports every file whose
//! base name fully matches a regular expression. Searches run on a
//! fixed-size [`WorkerPool`], one worker per search, and can be cancelled
//! individually or all at once. Outcomes are delivered to a [`ResultSink`]
//! you implement (or the ready-made [`ChannelSink`]), so any front end can
//! drive it.
//!
//! # Quick Start
//!
//! Blocking, on the current thread:
//!
//! ```rust,no_run
//! let results = rummage::search()
//!     .root("/var/log")
//!     .pattern(r".*\.log")
//!     .run()?;
//!
//! for path in &results.paths {
//!     println!("{}", path.display());
//! }
//! println!("{} match(es) in {:.3}s", results.matches, results.stats.duration.as_secs_f64());
//! # Ok::<(), rummage::RummageError>(())
//! ```
//!
//! Concurrent, with cancellation:
//!
//! ```rust,no_run
//! use rummage::{ChannelSink, SearchEvent, Searcher};
//!
//! let (sink, events) = ChannelSink::new();
//! let searcher = Searcher::new(5, sink)?;
//!
//! searcher.start_search("/home", r"(?i).*\.jpe?g")?;
//! searcher.start_search("/srv", r"core\.\d+")?;
//!
//! // Changed our minds: every in-flight search reports `Cancelled`.
//! searcher.cancel();
//!
//! // The pool is immediately ready for the next search.
//! searcher.start_search("/etc", r".*\.conf")?;
//! # for _ in events.iter() {}
//! # Ok::<(), rummage::RummageError>(())
//! ```
//!
//! # Matching
//!
//! The pattern must match the *entire* file name (`.*\.txt` matches
//! `notes.txt`, not `notes.txt.bak`), is tested against the base name only,
//! and is case-sensitive unless it says otherwise. Directories are walked but
//! never reported.
//!
//! # Errors
//!
//! Empty input is rejected before a task exists. A root that is not a
//! directory, or a pattern that does not compile, fails the task before the
//! walk starts. Subdirectories that cannot be read are skipped; they never
//! fail a search.

#![forbid(unsafe_code)]

pub mod matcher;
pub mod pool;
pub mod sink;
pub mod source;
pub mod walker;

mod builder;
mod entry;
mod error;
mod request;
mod results;
mod searcher;
mod task;
mod traits;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use builder::SearchBuilder;
pub use entry::{Entry, EntryKind};
pub use error::RummageError;
pub use matcher::{matches, RegexMatcher};
pub use pool::{PoolConfig, WorkerPool, DEFAULT_CAPACITY};
pub use request::{SearchOptions, SearchRequest};
pub use results::{Results, ScanStats};
pub use searcher::Searcher;
pub use sink::{ChannelSink, ResultSink, SearchEvent};
pub use source::{DirectorySource, WalkConfig};
pub use task::{CancelReason, CancelToken, Generation, SearchTask, TaskHandle, TaskId, TaskState};
pub use traits::{Matcher, Source};
pub use walker::Walker;

// ── Entry point ───────────────────────────────────────────────────────────────

/// Create a new [`SearchBuilder`] to configure and run a search.
///
/// # Example
///
/// ```rust
/// let dir = std::env::temp_dir();
/// let results = rummage::search()
///     .root(&dir)
///     .pattern(r"this-name-is-not-there-\d{12}\.bin")
///     .max_depth(1)
///     .run()
///     .unwrap();
///
/// assert_eq!(results.matches, 0);
/// ```
pub fn search() -> SearchBuilder {
    SearchBuilder::default()
}
