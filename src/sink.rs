use std::path::{Path, PathBuf};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::RummageError;
use crate::results::Results;
use crate::task::{CancelReason, TaskId};

/// Where a search task reports its outcome.
///
/// Implemented by whatever front end embeds the search: a CLI printing to
/// stdout, a GUI marshalling onto its event loop, a service writing to a
/// socket. Callbacks arrive on the worker thread running the task, so
/// implementations hand work off rather than block.
///
/// Per task, exactly one of [`on_completed`](ResultSink::on_completed),
/// [`on_cancelled`](ResultSink::on_cancelled) or
/// [`on_error`](ResultSink::on_error) is called, and nothing is called after it.
/// Results from different tasks sharing a sink may interleave.
pub trait ResultSink: Send + Sync {
    /// The task has been picked up by a worker and passed its checks
    /// for cancellation.
    fn on_started(&self, _task: TaskId) {}

    /// A match, delivered as it is found. Only called when the request
    /// asked for streaming. Provisional: if the task is later cancelled,
    /// no final list follows.
    fn on_match(&self, _task: TaskId, _path: &Path) {}

    /// The walk finished uncancelled. `results` holds every match.
    fn on_completed(&self, task: TaskId, results: Results);

    /// The task was cancelled, before or during the walk. Matches found so
    /// far are discarded.
    fn on_cancelled(&self, task: TaskId, reason: CancelReason);

    /// The root or the pattern was rejected; the walk never started.
    fn on_error(&self, task: TaskId, error: RummageError);
}

/// A sink callback, as a value.
#[derive(Debug)]
pub enum SearchEvent {
    Started(TaskId),
    Match(TaskId, PathBuf),
    Completed(TaskId, Results),
    Cancelled(TaskId, CancelReason),
    Failed(TaskId, RummageError),
}

impl SearchEvent {
    pub fn task(&self) -> TaskId {
        match self {
            Self::Started(id)
            | Self::Match(id, _)
            | Self::Completed(id, _)
            | Self::Cancelled(id, _)
            | Self::Failed(id, _) => *id,
        }
    }

    /// Whether this is the last event its task will produce.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(..) | Self::Cancelled(..) | Self::Failed(..))
    }
}

/// Forwards every callback as a [`SearchEvent`] over a channel.
///
/// Lets a front end consume results on a thread of its choosing. Events for
/// a receiver that has gone away are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<SearchEvent>,
}

impl ChannelSink {
    /// An unbounded channel and the sink feeding it.
    pub fn new() -> (Self, Receiver<SearchEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }

    pub fn from_sender(tx: Sender<SearchEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: SearchEvent) {
        let _ = self.tx.send(event);
    }
}

impl ResultSink for ChannelSink {
    fn on_started(&self, task: TaskId) {
        self.send(SearchEvent::Started(task));
    }

    fn on_match(&self, task: TaskId, path: &Path) {
        self.send(SearchEvent::Match(task, path.to_path_buf()));
    }

    fn on_completed(&self, task: TaskId, results: Results) {
        self.send(SearchEvent::Completed(task, results));
    }

    fn on_cancelled(&self, task: TaskId, reason: CancelReason) {
        self.send(SearchEvent::Cancelled(task, reason));
    }

    fn on_error(&self, task: TaskId, error: RummageError) {
        self.send(SearchEvent::Failed(task, error));
    }
}
