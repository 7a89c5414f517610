use std::cell::Cell;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use std::time::Instant;

use log::debug;

use crate::error::RummageError;
use crate::request::SearchRequest;
use crate::results::{Results, ScanStats};
use crate::sink::ResultSink;
use crate::source::DirectorySource;
use crate::walker::Walker;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one submitted search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The batch of submissions between two calls to
/// [`WorkerPool::cancel_all`](crate::pool::WorkerPool::cancel_all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(pub(crate) u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen {}", self.0)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle of a search task.
///
/// `Queued → Running → Completed | Cancelled | Failed`, plus
/// `Queued → Cancelled` for tasks cancelled before a worker picked them up.
/// Terminal states never change.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued    = 0,
    Running   = 1,
    Completed = 2,
    Cancelled = 3,
    Failed    = 4,
}

impl TaskState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Queued,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Cancelled,
            _ => Self::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// Why a task ended in [`TaskState::Cancelled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// `cancel()` on the task handle, or `cancel_all()` on its pool.
    Requested,

    /// The request's deadline expired mid-walk.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested        => f.write_str("cancelled"),
            Self::DeadlineExceeded => f.write_str("timed out"),
        }
    }
}

/// Shared lifecycle cell of one task.
///
/// Every transition is a compare-and-swap, so when cancellation races with
/// completion exactly one side wins and the task reports exactly one outcome.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<AtomicU8>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(TaskState::Queued as u8)),
        }
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Move a queued or running task to `Cancelled`.
    ///
    /// Returns `false` if the task had already reached a terminal state.
    pub fn cancel(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if TaskState::from_u8(current).is_terminal() {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                TaskState::Cancelled as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// `Queued → Running`. Fails if the task was cancelled first.
    pub(crate) fn start(&self) -> bool {
        self.transition(TaskState::Queued, TaskState::Running)
    }

    /// `Running → to`. Fails if the task was cancelled first.
    pub(crate) fn finish(&self, to: TaskState) -> bool {
        self.transition(TaskState::Running, to)
    }

    fn transition(&self, from: TaskState, to: TaskState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Caller-side view of a submitted task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id:         TaskId,
    generation: Generation,
    token:      CancelToken,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn state(&self) -> TaskState {
        self.token.state()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Cancel this task alone. Returns `false` if it had already finished.
    pub fn cancel(&self) -> bool {
        self.token.cancel()
    }
}

// ---------------------------------------------------------------------------
// SearchTask
// ---------------------------------------------------------------------------

/// One search bound to its sink.
///
/// Normally created by [`WorkerPool::submit`](crate::pool::WorkerPool::submit).
/// Can also be run on the current thread with [`run`](SearchTask::run).
pub struct SearchTask {
    id:         TaskId,
    generation: Generation,
    request:    SearchRequest,
    token:      CancelToken,
    sink:       Arc<dyn ResultSink>,
}

impl SearchTask {
    pub fn new(request: SearchRequest, sink: Arc<dyn ResultSink>) -> Self {
        Self {
            id: TaskId::next(),
            generation: Generation::default(),
            request,
            token: CancelToken::new(),
            sink,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            id:         self.id,
            generation: self.generation,
            token:      self.token.clone(),
        }
    }

    pub(crate) fn set_generation(&mut self, generation: Generation) {
        self.generation = generation;
    }

    pub(crate) fn token(&self) -> &CancelToken {
        &self.token
    }

    pub(crate) fn sink(&self) -> &Arc<dyn ResultSink> {
        &self.sink
    }

    /// Run the search to a terminal state and report it to the sink.
    ///
    /// Exactly one of `on_completed`, `on_cancelled` or `on_error` is called.
    /// A task cancelled before this point reports `on_cancelled` without
    /// touching the filesystem.
    pub fn run(self) -> TaskState {
        self.run_gated(&DeliveryGate::default())
    }

    /// [`run`](SearchTask::run), delivering matches and results through
    /// `gate` so a pool can fence them off when it cancels.
    pub(crate) fn run_gated(self, gate: &DeliveryGate) -> TaskState {
        let Self { id, request, token, sink, .. } = self;

        if !token.start() {
            debug!("task {id} cancelled before it started");
            sink.on_cancelled(id, CancelReason::Requested);
            return TaskState::Cancelled;
        }

        debug!("task {id} running: {:?} in {}", request.pattern(), request.root().display());
        sink.on_started(id);

        let stream = request.options().stream_matches;
        let outcome = execute(&request, &token, |path| {
            if stream {
                let _delivery = gate.enter();
                if token.state() == TaskState::Running {
                    sink.on_match(id, path);
                }
            }
        });

        // The final transition and the sink call happen under one entry.
        let delivery = gate.enter();
        match outcome {
            Ok(results) if token.finish(TaskState::Completed) => {
                debug!("task {id} completed with {} match(es)", results.matches);
                sink.on_completed(id, results);
                TaskState::Completed
            }
            Err(Halt::Failed(err)) if token.finish(TaskState::Failed) => {
                debug!("task {id} failed: {err}");
                sink.on_error(id, err);
                TaskState::Failed
            }
            Err(Halt::Cancelled(reason)) => {
                drop(delivery);
                debug!("task {id} {reason}");
                sink.on_cancelled(id, reason);
                TaskState::Cancelled
            }
            // Cancelled between the end of the walk and the final transition.
            _ => {
                drop(delivery);
                debug!("task {id} cancelled while finishing");
                sink.on_cancelled(id, CancelReason::Requested);
                TaskState::Cancelled
            }
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryGate
// ---------------------------------------------------------------------------

thread_local! {
    static DELIVERING: Cell<usize> = const { Cell::new(0) };
}

/// Fences sink deliveries off from cancellation.
///
/// A task holds the read side from the moment it checks its own state until
/// the sink call returns. [`drain`](DeliveryGate::drain) takes the write side,
/// so once every live token has been cancelled and `drain` has returned, no
/// delivery from those tasks is in flight and none can start.
#[derive(Debug, Default)]
pub(crate) struct DeliveryGate {
    lock: RwLock<()>,
}

impl DeliveryGate {
    pub(crate) fn enter(&self) -> Delivery<'_> {
        let guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        DELIVERING.with(|n| n.set(n.get() + 1));
        Delivery { _guard: guard }
    }

    /// Wait until every delivery already inside the gate has returned.
    ///
    /// Called from inside a sink callback this would wait on itself, so it
    /// returns at once there.
    pub(crate) fn drain(&self) {
        if DELIVERING.with(Cell::get) > 0 {
            return;
        }
        drop(self.lock.write().unwrap_or_else(PoisonError::into_inner));
    }
}

pub(crate) struct Delivery<'a> {
    _guard: RwLockReadGuard<'a, ()>,
}

impl Drop for Delivery<'_> {
    fn drop(&mut self) {
        DELIVERING.with(|n| n.set(n.get() - 1));
    }
}

// ---------------------------------------------------------------------------
// execute()
// ---------------------------------------------------------------------------

/// Why [`execute`] stopped without results.
#[derive(Debug)]
pub(crate) enum Halt {
    Cancelled(CancelReason),
    Failed(RummageError),
}

/// Validate `request` and walk it. `token` must already be `Running`.
///
/// Matches are handed to `on_match` as they are found, then returned in
/// full. A deadline expiry moves `token` to `Cancelled` itself.
pub(crate) fn execute<F>(request: &SearchRequest, token: &CancelToken, mut on_match: F) -> Result<Results, Halt>
where
    F: FnMut(&Path),
{
    let (root, matcher) = request.validate().map_err(Halt::Failed)?;
    let options = request.options();

    let start    = Instant::now();
    let deadline = options.deadline.map(|d| start + d);
    let expired  = || deadline.is_some_and(|d| Instant::now() >= d);

    let source  = DirectorySource::new(root);
    let mut walker = Walker::new(&source, &options.walk_config(), &matcher, || {
        token.is_cancelled() || expired()
    });

    let mut paths  = Vec::new();
    let mut errors = Vec::new();
    let mut limit_reached = options.limit == Some(0);

    if !limit_reached {
        for item in walker.by_ref() {
            match item {
                Ok(entry) => {
                    on_match(&entry.path);
                    paths.push(entry.path);
                    if options.limit.is_some_and(|l| paths.len() >= l) {
                        limit_reached = true;
                        break;
                    }
                }
                Err(err) if options.collect_errors => errors.push(err),
                Err(_) => {}
            }
        }
    }

    if walker.was_cancelled() {
        // The token wins over the deadline: if someone cancelled, say so.
        let reason = if !token.is_cancelled() && token.cancel() {
            CancelReason::DeadlineExceeded
        } else {
            CancelReason::Requested
        };
        return Err(Halt::Cancelled(reason));
    }

    let stats = ScanStats::compute(walker.files_seen(), walker.dirs_seen(), start.elapsed());

    Ok(Results {
        matches: paths.len(),
        paths,
        limit_reached,
        stats,
        errors,
    })
}
