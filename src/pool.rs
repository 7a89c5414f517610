use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::error::RummageError;
use crate::request::SearchRequest;
use crate::sink::ResultSink;
use crate::task::{CancelToken, DeliveryGate, Generation, SearchTask, TaskHandle, TaskId, TaskState};

/// Worker count used by [`PoolConfig::default`].
pub const DEFAULT_CAPACITY: usize = 5;

// ---------------------------------------------------------------------------
// PoolConfig
// ---------------------------------------------------------------------------

/// Construction parameters for a [`WorkerPool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads, and so the maximum number of searches
    /// running at once. Fixed for the life of the pool.
    pub capacity: usize,

    /// Prefix for worker thread names; workers are named `<prefix>-<n>`.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity:    DEFAULT_CAPACITY,
            thread_name: "rummage-worker".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Tasks the pool knows about that have not finished yet, keyed by id.
///
/// `submit` and `cancel_all` both hold this lock, which is what puts every
/// submission unambiguously in one generation.
#[derive(Default)]
struct Registry {
    generation: u64,
    live:       HashMap<TaskId, CancelToken>,
}

#[derive(Default)]
struct Shared {
    registry: Mutex<Registry>,
    delivery: DeliveryGate,
    active:   AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> Generation {
        Generation(self.lock().generation)
    }

    fn forget(&self, id: TaskId) {
        self.lock().live.remove(&id);
    }
}

// ---------------------------------------------------------------------------
// WorkerPool
// ---------------------------------------------------------------------------

/// Fixed-size pool of search workers.
///
/// Each submitted search occupies one worker for its whole walk; at most
/// `capacity` searches run at once and the rest wait in a FIFO queue.
/// [`cancel_all`](WorkerPool::cancel_all) ends the current generation:
/// running searches are told to stop, queued ones are evicted, and the pool
/// is immediately ready for new work.
///
/// Dropping the pool cancels everything and joins the workers. Use
/// [`shutdown`](WorkerPool::shutdown) to let queued work finish instead.
pub struct WorkerPool {
    shared:   Arc<Shared>,
    sender:   Option<Sender<SearchTask>>,
    receiver: Receiver<SearchTask>,
    workers:  Vec<JoinHandle<()>>,
    capacity: usize,
}

impl WorkerPool {
    /// A pool of `capacity` workers with default thread names.
    pub fn new(capacity: usize) -> Result<Self, RummageError> {
        Self::with_config(PoolConfig {
            capacity,
            ..PoolConfig::default()
        })
    }

    /// # Errors
    ///
    /// [`RummageError::InvalidCapacity`] for a capacity of zero,
    /// [`RummageError::ThreadPool`] if a worker thread cannot be spawned.
    pub fn with_config(config: PoolConfig) -> Result<Self, RummageError> {
        if config.capacity == 0 {
            return Err(RummageError::InvalidCapacity(0));
        }

        let (sender, receiver) = unbounded::<SearchTask>();
        let shared = Arc::new(Shared::default());

        let mut workers = Vec::with_capacity(config.capacity);
        for n in 0..config.capacity {
            let rx     = receiver.clone();
            let shared = Arc::clone(&shared);

            let handle = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, n))
                .spawn(move || worker_loop(&shared, &rx))
                .map_err(|e| RummageError::ThreadPool(e.to_string()))?;
            workers.push(handle);
        }

        debug!("started pool with {} worker(s)", config.capacity);

        Ok(Self {
            shared,
            sender: Some(sender),
            receiver,
            workers,
            capacity: config.capacity,
        })
    }

    /// Queue a search. Returns immediately.
    pub fn submit(&self, request: SearchRequest, sink: Arc<dyn ResultSink>) -> Result<TaskHandle, RummageError> {
        self.submit_task(SearchTask::new(request, sink))
    }

    /// Queue an already-built task. It joins the current generation,
    /// whatever generation it carried before.
    ///
    /// # Errors
    ///
    /// [`RummageError::ThreadPool`] once the pool has been shut down.
    pub fn submit_task(&self, mut task: SearchTask) -> Result<TaskHandle, RummageError> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| RummageError::ThreadPool("pool is shut down".into()))?;

        let mut registry = self.shared.lock();
        task.set_generation(Generation(registry.generation));
        let handle = task.handle();

        registry.live.insert(handle.id(), task.token().clone());
        if sender.send(task).is_err() {
            registry.live.remove(&handle.id());
            return Err(RummageError::ThreadPool("no workers left".into()));
        }

        debug!("queued task {} in {}", handle.id(), handle.generation());
        Ok(handle)
    }

    /// Cancel every running and queued search and start a new generation.
    ///
    /// Running searches stop at their next directory or file boundary and
    /// report `on_cancelled`; queued ones are removed from the queue and
    /// report `on_cancelled` from this call without ever running. Nothing
    /// submitted before this call can deliver results afterwards: a match or
    /// completion that was already being handed to its sink is waited for
    /// before this returns. Every worker is free again once the running
    /// searches have unwound.
    ///
    /// Called from inside a sink's `on_match` or `on_completed`, the wait is
    /// skipped, since it would be waiting on the caller itself.
    ///
    /// Returns the new generation.
    pub fn cancel_all(&self) -> Generation {
        let (evicted, signalled, generation) = {
            let mut registry = self.shared.lock();

            let signalled = registry
                .live
                .values()
                .filter(|token| token.cancel())
                .count();

            let evicted: Vec<SearchTask> = self.receiver.try_iter().collect();
            for task in &evicted {
                registry.live.remove(&task.id());
            }

            registry.generation += 1;
            (evicted, signalled, Generation(registry.generation))
        };

        // Every old token is cancelled; wait out deliveries that beat it.
        self.shared.delivery.drain();

        info!(
            "cancelled {signalled} task(s), evicted {} queued; now at {generation}",
            evicted.len()
        );

        // Outside the lock: a sink may well submit again from its callback.
        for task in evicted {
            task.run();
        }

        generation
    }

    /// Number of worker threads.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Searches currently occupying a worker.
    pub fn active_count(&self) -> usize {
        self.shared.active.load(Ordering::Relaxed)
    }

    /// Searches waiting for a worker.
    pub fn queued_count(&self) -> usize {
        self.receiver.len()
    }

    pub fn generation(&self) -> Generation {
        self.shared.generation()
    }

    /// Stop accepting work, let queued searches finish, and join the workers.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        // Dropping the only sender ends each worker's `recv` loop once the
        // queue is empty.
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("search worker exited abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.sender.is_some() {
            self.cancel_all();
            self.close();
        }
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

fn worker_loop(shared: &Shared, rx: &Receiver<SearchTask>) {
    while let Ok(task) = rx.recv() {
        run_one(shared, task);
    }
}

fn run_one(shared: &Shared, task: SearchTask) {
    let id    = task.id();
    let token = task.token().clone();
    let sink  = Arc::clone(task.sink());

    let current = shared.generation();
    if task.generation() != current {
        warn!("task {id} belongs to {}, pool is at {current}; dropping it", task.generation());
        token.cancel();
    }

    shared.active.fetch_add(1, Ordering::Relaxed);
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.run_gated(&shared.delivery)));
    shared.active.fetch_sub(1, Ordering::Relaxed);
    shared.forget(id);

    if outcome.is_err() {
        error!("task {id} panicked; worker recovered");
        // Only report if the panic came before the task settled; a sink
        // that panicked inside its terminal callback has had its one call.
        let _delivery = shared.delivery.enter();
        if token.state() == TaskState::Running && token.finish(TaskState::Failed) {
            let report = AssertUnwindSafe(|| {
                sink.on_error(id, RummageError::ThreadPool(format!("task {id} panicked")))
            });
            if panic::catch_unwind(report).is_err() {
                error!("sink panicked while reporting task {id}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    use crate::sink::{ChannelSink, SearchEvent};

    const WAIT: Duration = Duration::from_secs(10);

    fn request(root: &std::path::Path) -> SearchRequest {
        SearchRequest::new(root, r".*\.txt").unwrap()
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(WorkerPool::new(0), Err(RummageError::InvalidCapacity(0))));
    }

    #[test]
    fn runs_a_submitted_search() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x.txt"), "").unwrap();

        let pool = WorkerPool::new(2).unwrap();
        let (sink, events) = ChannelSink::new();
        let handle = pool.submit(request(dir.path()), Arc::new(sink)).unwrap();

        let terminal = loop {
            let event = events.recv_timeout(WAIT).unwrap();
            if event.is_terminal() {
                break event;
            }
        };

        assert_eq!(terminal.task(), handle.id());
        assert!(matches!(terminal, SearchEvent::Completed(_, ref r) if r.matches == 1));
        assert_eq!(handle.state(), TaskState::Completed);
    }

    #[test]
    fn cancel_all_advances_the_generation() {
        let pool = WorkerPool::new(1).unwrap();
        let before = pool.generation();
        let after  = pool.cancel_all();

        assert!(after > before);
        assert_eq!(pool.generation(), after);
    }

    #[test]
    fn submissions_carry_the_current_generation() {
        let dir  = tempfile::tempdir().unwrap();
        let pool = WorkerPool::new(1).unwrap();
        let (sink, _events) = ChannelSink::new();
        let sink: Arc<dyn ResultSink> = Arc::new(sink);

        let first = pool.submit(request(dir.path()), Arc::clone(&sink)).unwrap();
        pool.cancel_all();
        let second = pool.submit(request(dir.path()), sink).unwrap();

        assert!(second.generation() > first.generation());
    }

    #[test]
    fn shut_down_pool_rejects_work() {
        let dir = tempfile::tempdir().unwrap();
        let mut pool = WorkerPool::new(1).unwrap();
        pool.close();

        let (sink, _events) = ChannelSink::new();
        let err = pool.submit(request(dir.path()), Arc::new(sink)).unwrap_err();
        assert!(matches!(err, RummageError::ThreadPool(_)));
    }

    #[test]
    fn shutdown_drains_the_queue() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("y.txt"), "").unwrap();

        let pool = WorkerPool::new(1).unwrap();
        let (sink, events) = ChannelSink::new();
        let sink: Arc<dyn ResultSink> = Arc::new(sink);
        for _ in 0..4 {
            pool.submit(request(dir.path()), Arc::clone(&sink)).unwrap();
        }
        pool.shutdown();

        let completed = events
            .try_iter()
            .filter(|e| matches!(e, SearchEvent::Completed(..)))
            .count();
        assert_eq!(completed, 4);
    }

    #[test]
    fn default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.thread_name, "rummage-worker");
    }
}
