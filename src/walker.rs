use std::iter::FusedIterator;

use log::debug;

use crate::entry::{Entry, EntryKind};
use crate::error::RummageError;
use crate::source::WalkConfig;
use crate::traits::{Matcher, Source};

/// Lazy depth-first walk that yields matching files.
///
/// Every entry that is not a directory counts as a file here, including
/// pipes, sockets and dangling links. Links to directories are skipped.
///
/// Items are either a matched file (`Ok`) or a recoverable error for a
/// subtree that could not be listed (`Err`). Errors do not end the
/// iteration; the subtree simply contributes nothing.
///
/// `is_cancelled` is consulted before every pull from the source, which is
/// before each directory is descended into and before each file is tested.
/// Once it returns `true` the walker yields `None` from then on and
/// [`was_cancelled`](Walker::was_cancelled) reports it. Anything already
/// yielded is the caller's to discard.
pub struct Walker<'a> {
    entries:      Box<dyn Iterator<Item = Result<Entry, RummageError>> + 'a>,
    matcher:      &'a dyn Matcher,
    is_cancelled: Box<dyn Fn() -> bool + 'a>,
    files:        usize,
    dirs:         usize,
    cancelled:    bool,
    done:         bool,
}

impl<'a> Walker<'a> {
    pub fn new<C>(
        source:       &'a dyn Source,
        config:       &WalkConfig,
        matcher:      &'a dyn Matcher,
        is_cancelled: C,
    ) -> Self
    where
        C: Fn() -> bool + 'a,
    {
        Self {
            entries:      source.walk(config),
            matcher,
            is_cancelled: Box::new(is_cancelled),
            files:        0,
            dirs:         0,
            cancelled:    false,
            done:         false,
        }
    }

    /// Non-directory entries encountered so far, matched or not.
    pub fn files_seen(&self) -> usize {
        self.files
    }

    /// Directories encountered so far, excluding the root.
    pub fn dirs_seen(&self) -> usize {
        self.dirs
    }

    /// Whether the walk stopped because cancellation was observed.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Iterator for Walker<'_> {
    type Item = Result<Entry, RummageError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if (self.is_cancelled)() {
                self.cancelled = true;
                self.done = true;
                return None;
            }

            let entry = match self.entries.next() {
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    debug!("skipping unreadable subtree: {err}");
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };

            match entry.kind {
                EntryKind::Dir => self.dirs += 1,
                EntryKind::Symlink => {}
                EntryKind::File | EntryKind::Other => {
                    self.files += 1;
                    if self.matcher.is_match(&entry) {
                        return Some(Ok(entry));
                    }
                }
            }
        }
    }
}

impl FusedIterator for Walker<'_> {}
