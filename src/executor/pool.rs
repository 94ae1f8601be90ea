//! Elastic Worker Pool
//!
//! OS threads pulling from a bounded FIFO queue. The pool grows towards the
//! high watermark while every worker is busy and shrinks back to the low
//! watermark once workers sit idle for longer than the idle timeout.

use std::any::Any;
use std::cell::Cell;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};

use crate::executor::ExecutorConfig;

type Task = Box<dyn FnOnce() + Send + 'static>;

thread_local! {
    /// Address of the pool that owns the current thread, 0 if none.
    static OWNING_POOL: Cell<usize> = const { Cell::new(0) };
}

// == Executor State ==
/// Lifecycle of an [`Executor`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorState {
    /// Accepting tasks
    Running,
    /// Draining queued and in-flight tasks, accepting nothing new
    Stopping,
    /// Every worker has exited
    Stopped,
}

// == Executor Stats ==
/// Point-in-time view of the pool.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutorStats {
    pub state: ExecutorState,
    /// Live worker threads
    pub workers: usize,
    /// Workers currently running a task
    pub occupied: usize,
    /// Tasks waiting to start
    pub queued: usize,
    pub low_watermark: usize,
    pub high_watermark: usize,
    pub max_queue_size: usize,
}

/// Everything guarded by the pool mutex.
struct Inner {
    state: ExecutorState,
    tasks: VecDeque<Task>,
    workers: HashSet<u64>,
    occupied: usize,
    next_worker_id: u64,
}

impl Inner {
    /// Workers not running a task.
    fn idle(&self) -> usize {
        self.workers.len().saturating_sub(self.occupied)
    }

    /// Queued tasks beyond those already claimed by an idle worker. A woken
    /// worker may not have dequeued its task yet, so queue length alone
    /// over-counts the backlog during a burst.
    fn backlog(&self) -> usize {
        self.tasks.len().saturating_sub(self.idle())
    }
}

struct Shared {
    config: ExecutorConfig,
    inner: Mutex<Inner>,
    /// Signalled when a task is queued or a stop is requested
    task_ready: Condvar,
    /// Signalled when the last worker exits
    drained: Condvar,
}

impl Shared {
    fn key(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }
}

// == Executor ==
/// Dynamically sized thread pool with a bounded task queue.
///
/// Tasks run outside the pool lock. A panicking task is logged and dropped;
/// the worker that ran it keeps serving the queue.
///
/// Dropping the executor stops it and waits for queued work to finish,
/// unless the drop happens on one of its own workers, in which case the
/// shutdown proceeds in the background.
pub struct Executor {
    shared: Arc<Shared>,
}

impl Executor {
    // == Constructor ==
    /// Creates a pool and starts `low_watermark` workers.
    pub fn new(config: ExecutorConfig) -> Self {
        let config = config.normalized();
        let shared = Arc::new(Shared {
            config,
            inner: Mutex::new(Inner {
                state: ExecutorState::Running,
                tasks: VecDeque::with_capacity(config.max_queue_size),
                workers: HashSet::new(),
                occupied: 0,
                next_worker_id: 0,
            }),
            task_ready: Condvar::new(),
            drained: Condvar::new(),
        });

        {
            let mut inner = shared.inner.lock();
            for _ in 0..config.low_watermark {
                spawn_worker(&shared, &mut inner);
            }
        }

        info!(
            "Executor started: low_watermark={}, high_watermark={}, max_queue_size={}, idle_timeout={:?}",
            config.low_watermark, config.high_watermark, config.max_queue_size, config.idle_timeout
        );

        Self { shared }
    }

    // == Submit ==
    /// Queues a task. Returns false when the pool is not running or the
    /// backlog is full.
    ///
    /// Each queued task claims an idle worker. A new worker is started when
    /// there is no idle worker left to claim and the pool is below its high
    /// watermark.
    pub fn submit<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let config = &self.shared.config;
        let mut inner = self.shared.inner.lock();

        if inner.state != ExecutorState::Running {
            trace!("Task rejected: executor is {:?}", inner.state);
            return false;
        }
        if inner.backlog() >= config.max_queue_size {
            trace!("Task rejected: queue is full ({})", config.max_queue_size);
            return false;
        }

        inner.tasks.push_back(Box::new(task));
        if inner.backlog() > 0 && inner.workers.len() < config.high_watermark {
            spawn_worker(&self.shared, &mut inner);
        }
        drop(inner);

        self.shared.task_ready.notify_one();
        true
    }

    // == Stop ==
    /// Stops accepting tasks. Workers finish everything already queued and
    /// then exit.
    ///
    /// With `await_workers` the call blocks until every worker has exited,
    /// except on one of this pool's own workers, where it returns at once
    /// and the shutdown proceeds in the background. Safe to call repeatedly.
    pub fn stop(&self, await_workers: bool) {
        let on_own_worker = OWNING_POOL.with(Cell::get) == self.shared.key();
        if await_workers && on_own_worker {
            debug!("Stop requested on an executor worker, not waiting for workers");
        }
        let await_workers = await_workers && !on_own_worker;

        let mut inner = self.shared.inner.lock();

        if inner.state == ExecutorState::Running {
            inner.state = if inner.workers.is_empty() {
                ExecutorState::Stopped
            } else {
                ExecutorState::Stopping
            };
            info!(
                "Executor stopping: {} workers, {} queued tasks",
                inner.workers.len(),
                inner.tasks.len()
            );
        }
        self.shared.task_ready.notify_all();

        if await_workers {
            while !inner.workers.is_empty() {
                self.shared.drained.wait(&mut inner);
            }
        }
    }

    // == Observers ==
    pub fn state(&self) -> ExecutorState {
        self.shared.inner.lock().state
    }

    /// Number of live worker threads.
    pub fn worker_count(&self) -> usize {
        self.shared.inner.lock().workers.len()
    }

    /// Number of workers currently running a task.
    pub fn occupied_count(&self) -> usize {
        self.shared.inner.lock().occupied
    }

    /// Number of tasks waiting to start.
    pub fn queue_len(&self) -> usize {
        self.shared.inner.lock().tasks.len()
    }

    /// The effective (clamped) configuration.
    pub fn config(&self) -> ExecutorConfig {
        self.shared.config
    }

    pub fn stats(&self) -> ExecutorStats {
        let config = &self.shared.config;
        let inner = self.shared.inner.lock();
        ExecutorStats {
            state: inner.state,
            workers: inner.workers.len(),
            occupied: inner.occupied,
            queued: inner.tasks.len(),
            low_watermark: config.low_watermark,
            high_watermark: config.high_watermark,
            max_queue_size: config.max_queue_size,
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.stop(true);
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.shared.config)
            .field("stats", &self.stats())
            .finish()
    }
}

// == Worker Lifecycle ==
/// Starts a worker thread and registers it. Must be called with the pool
/// lock held; the new thread blocks on that lock until the caller releases it.
fn spawn_worker(shared: &Arc<Shared>, inner: &mut Inner) -> bool {
    let id = inner.next_worker_id;
    inner.next_worker_id += 1;

    let worker_shared = Arc::clone(shared);
    let spawned = thread::Builder::new()
        .name(format!("executor-worker-{id}"))
        .spawn(move || run_worker(worker_shared, id));

    match spawned {
        Ok(_detached) => {
            inner.workers.insert(id);
            debug!("Worker {} started ({} live)", id, inner.workers.len());
            true
        }
        Err(err) => {
            warn!("Failed to spawn worker {}: {}", id, err);
            false
        }
    }
}

fn run_worker(shared: Arc<Shared>, id: u64) {
    OWNING_POOL.with(|pool| pool.set(shared.key()));

    loop {
        let task = {
            let mut inner = shared.inner.lock();
            match next_task(&shared, &mut inner) {
                Some(task) => {
                    inner.occupied += 1;
                    task
                }
                None => {
                    retire(&shared, &mut inner, id);
                    return;
                }
            }
        };

        if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
            error!("Task panicked on worker {}: {}", id, panic_message(&*payload));
        }

        shared.inner.lock().occupied -= 1;
    }
}

/// Blocks until there is a task to run. Returns None when the worker
/// should exit: the pool is shutting down with an empty queue, or the
/// worker idled past the timeout while the pool is above its low watermark.
fn next_task(shared: &Shared, inner: &mut MutexGuard<'_, Inner>) -> Option<Task> {
    loop {
        if let Some(task) = inner.tasks.pop_front() {
            return Some(task);
        }
        if inner.state != ExecutorState::Running {
            return None;
        }

        let timed_out = shared
            .task_ready
            .wait_for(inner, shared.config.idle_timeout)
            .timed_out();
        if timed_out
            && inner.tasks.is_empty()
            && inner.state == ExecutorState::Running
            && inner.workers.len() > shared.config.low_watermark
        {
            return None;
        }
    }
}

fn retire(shared: &Shared, inner: &mut Inner, id: u64) {
    inner.workers.remove(&id);
    debug!("Worker {} exited ({} live)", id, inner.workers.len());

    if inner.workers.is_empty() {
        if inner.state != ExecutorState::Running {
            inner.state = ExecutorState::Stopped;
            info!("Executor stopped");
        }
        shared.drained.notify_all();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
