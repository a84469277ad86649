//! Bounded worker pool with a synchronous hand-off.
//!
//! Jobs are handed to an idle thread through a zero-capacity (rendezvous)
//! channel. When no thread is waiting, the pool grows up to `max_size`;
//! when it cannot grow, the job runs on the submitting thread (caller-runs
//! backstop, never dropped). Threads above `core_size` exit after sitting
//! idle for `keep_alive`.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;

use gatehouse_core::EngineContext;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone, Debug)]
pub struct WorkerPoolConfig {
    /// Thread names are `name_prefix` + sequence number.
    pub name_prefix: String,
    /// Threads kept alive even when idle.
    pub core_size: usize,
    /// Hard ceiling on pool threads.
    pub max_size: usize,
    /// Idle lifetime of threads above `core_size`.
    pub keep_alive: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            name_prefix: "gatehouse-worker-".to_string(),
            core_size: 2,
            max_size: 24,
            keep_alive: Duration::from_millis(5_000),
        }
    }
}

#[derive(Clone)]
pub struct WorkerPool {
    shared: Arc<PoolShared>,
}

struct PoolShared {
    tx: Sender<Job>,
    rx: Receiver<Job>,
    config: WorkerPoolConfig,
    ctx: EngineContext,
    thread_seq: AtomicUsize,
    live: AtomicUsize,
    shutdown: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(config: WorkerPoolConfig, ctx: EngineContext) -> Self {
        assert!(config.max_size > 0, "worker pool max_size must be positive");
        assert!(
            config.core_size <= config.max_size,
            "worker pool core_size cannot exceed max_size"
        );
        // Zero capacity: a send succeeds only when a thread is blocked waiting.
        let (tx, rx) = bounded(0);
        Self {
            shared: Arc::new(PoolShared {
                tx,
                rx,
                config,
                ctx,
                thread_seq: AtomicUsize::new(0),
                live: AtomicUsize::new(0),
                shutdown: AtomicBool::new(false),
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Execute `job` on a pool thread, growing the pool if needed, or on the
    /// calling thread when the pool is saturated or shut down.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.execute_boxed(Box::new(job));
    }

    fn execute_boxed(&self, job: Job) {
        let shared = &self.shared;
        if shared.shutdown.load(Ordering::Acquire) {
            run_job(job);
            return;
        }
        let job = match shared.tx.try_send(job) {
            Ok(()) => return,
            Err(TrySendError::Full(job)) | Err(TrySendError::Disconnected(job)) => job,
        };
        // No idle thread took the hand-off: grow, or fall back to the caller.
        match self.try_spawn(job) {
            None => {}
            Some(job) => {
                tracing::debug!(
                    live = shared.live.load(Ordering::Acquire),
                    max = shared.config.max_size,
                    "Worker pool saturated, running job on the submitting thread"
                );
                run_job(job);
            }
        }
    }

    /// Spawn a worker seeded with `job`. Returns the job back when the pool
    /// is at `max_size` or the OS refuses a thread.
    fn try_spawn(&self, job: Job) -> Option<Job> {
        let shared = &self.shared;
        let reserved = shared
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < shared.config.max_size).then_some(n + 1)
            });
        if reserved.is_err() {
            return Some(job);
        }

        let seq = shared.thread_seq.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}{}", shared.config.name_prefix, seq);
        // The seed job rides in a shared slot so a failed spawn can take it
        // back instead of dropping it.
        let slot = Arc::new(Mutex::new(Some(job)));
        let worker_slot = Arc::clone(&slot);
        let worker_shared = Arc::clone(shared);
        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            let first = worker_slot.lock().take();
            worker_loop(worker_shared, first);
        });
        match spawned {
            Ok(handle) => {
                shared.handles.lock().push(handle);
                None
            }
            Err(e) => {
                shared.live.fetch_sub(1, Ordering::AcqRel);
                tracing::error!(error = %e, thread = %name, "Failed to spawn worker thread");
                slot.lock().take()
            }
        }
    }

    /// Begin shutdown: flip the flag, then hand a no-op to every thread
    /// blocked on the rendezvous so it wakes and observes the state.
    pub fn shutdown(&self) {
        let shared = &self.shared;
        if shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        let live = shared.live.load(Ordering::Acquire);
        for _ in 0..live {
            let _ = shared.tx.try_send(Box::new(|| {}));
        }
        tracing::info!(live_threads = live, "Worker pool shutting down");
    }

    /// Wait for all worker threads to exit. Call after [`shutdown`].
    ///
    /// [`shutdown`]: WorkerPool::shutdown
    pub fn join(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.shared.handles.lock());
        for handle in handles {
            let _ = handle.join();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Number of currently live pool threads.
    pub fn pool_size(&self) -> usize {
        self.shared.live.load(Ordering::Acquire)
    }

    /// Total threads created over the pool's lifetime.
    pub fn threads_spawned(&self) -> usize {
        self.shared.thread_seq.load(Ordering::Relaxed)
    }
}

fn worker_loop(shared: Arc<PoolShared>, first: Option<Job>) {
    // Runs the context exit hook and drops the live count exactly once,
    // whether the loop ends normally or the thread unwinds.
    let _exit = ThreadExitGuard {
        shared: Arc::clone(&shared),
    };
    if let Some(job) = first {
        run_job(job);
    }
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
        match shared.rx.recv_timeout(shared.config.keep_alive) {
            Ok(job) => run_job(job),
            Err(RecvTimeoutError::Timeout) => {
                // Idle past keep-alive: excess threads retire. Two threads
                // racing here may transiently shrink below core; the pool
                // regrows on demand.
                if shared.live.load(Ordering::Acquire) > shared.config.core_size {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// A panicking job must not take its thread down with it.
fn run_job(job: Job) {
    if std::panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        tracing::warn!(
            thread = %thread::current().name().unwrap_or("<unnamed>"),
            "Worker job panicked"
        );
    }
}

struct ThreadExitGuard {
    shared: Arc<PoolShared>,
}

impl Drop for ThreadExitGuard {
    fn drop(&mut self) {
        self.shared.live.fetch_sub(1, Ordering::AcqRel);
        if let Some(hook) = self.shared.ctx.thread_exit_hook() {
            hook();
        }
        tracing::debug!(
            thread = %thread::current().name().unwrap_or("<unnamed>"),
            "Worker thread exiting"
        );
    }
}
