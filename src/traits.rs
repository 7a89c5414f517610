use crate::entry::Entry;
use crate::error::RummageError;
use crate::source::WalkConfig;

/// A source of entries to search through.
///
/// [`DirectorySource`](crate::source::DirectorySource) is the implementation
/// used by search tasks. Implement this yourself to run the walker over
/// something else (an in-memory listing, an archive index) with the same
/// matching and cancellation behaviour.
///
/// # Ordering
///
/// Entries must come out depth-first: a directory's descendants are yielded
/// before its next sibling. The walker never sorts; discovery order is the
/// order of this iterator.
///
/// # Error Handling
///
/// A subtree that cannot be listed should be yielded as a recoverable
/// `Err(RummageError)` and then skipped; it must not end the iteration.
///
/// # Example
///
/// ```rust
/// use rummage::{Entry, RummageError, Source, WalkConfig};
///
/// struct VecSource(Vec<&'static str>);
///
/// impl Source for VecSource {
///     fn walk(&self, _config: &WalkConfig) -> Box<dyn Iterator<Item = Result<Entry, RummageError>> + '_> {
///         Box::new(self.0.iter().map(|p| Ok(Entry::file(*p, 1))))
///     }
/// }
/// ```
pub trait Source: Send + Sync {
    /// Traverse the source and yield entries, lazily.
    ///
    /// `config` carries traversal parameters (depth limit, link following)
    /// so sources can honour them during their own traversal logic.
    fn walk(&self, config: &WalkConfig) -> Box<dyn Iterator<Item = Result<Entry, RummageError>> + '_>;
}

/// Determines whether an entry is a match.
///
/// # Thread Safety
///
/// `Send + Sync` are required: one matcher may be shared by tasks running on
/// different workers, and `is_match` takes `&self`, so implementations hold
/// no mutable state.
///
/// # Example
///
/// ```rust
/// use rummage::{Matcher, Entry};
///
/// struct ExtensionMatcher(String);
///
/// impl Matcher for ExtensionMatcher {
///     fn is_match(&self, entry: &Entry) -> bool {
///         entry.path
///             .extension()
///             .map(|e| e.eq_ignore_ascii_case(&self.0))
///             .unwrap_or(false)
///     }
/// }
/// ```
pub trait Matcher: Send + Sync {
    /// Returns `true` if this entry should be included in results.
    fn is_match(&self, entry: &Entry) -> bool;
}
