//! Bounded dispatcher in front of the shared worker pool.
//!
//! Submitted work enters a bounded FIFO queue drained by a single dispatch
//! thread. Ordinary work acquires a permit before it reaches the pool, so at
//! most `max(processor_count, 3)` ordinary items execute concurrently
//! through one dispatcher. Privileged work passes through the same queue but
//! skips the permit gate. When the queue is full the work runs synchronously
//! on the submitting thread; nothing is ever dropped or rejected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;

use gatehouse_core::{AppError, EngineContext};

use crate::permits::{Permit, PermitPool};
use crate::pool::WorkerPool;

/// Fixed capacity of the pending-work queue.
pub const QUEUE_CAPACITY: usize = 30;

/// Bounded wait per queue poll; keeps the loop responsive to termination.
const QUEUE_POLL: Duration = Duration::from_secs(5);

/// Interval between drain re-checks in `await_termination`.
const DRAIN_POLL: Duration = Duration::from_millis(10);

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Hook invoked after each dispatched item finishes, successful or not.
pub type TaskCompleteHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
pub struct DispatcherConfig {
    /// Internal deadline for draining at shutdown. Independent of any
    /// caller-supplied timeout. `None` uses [`DispatcherConfig::DEFAULT_DRAIN_DEADLINE`].
    pub drain_deadline: Option<Duration>,
    /// Invoked after every dispatched item completes.
    pub on_task_complete: Option<TaskCompleteHook>,
}

impl DispatcherConfig {
    pub const DEFAULT_DRAIN_DEADLINE: Duration = Duration::from_secs(10);

    fn drain_deadline(&self) -> Duration {
        self.drain_deadline.unwrap_or(Self::DEFAULT_DRAIN_DEADLINE)
    }
}

struct PendingWork {
    run: Job,
    privileged: bool,
}

#[derive(Clone)]
pub struct BoundedDispatcher {
    shared: Arc<DispatchShared>,
}

struct DispatchShared {
    tx: Sender<PendingWork>,
    rx: Receiver<PendingWork>,
    permits: Arc<PermitPool>,
    pool: WorkerPool,
    config: DispatcherConfig,
    shutdown: AtomicBool,
    terminated: AtomicBool,
    loop_thread: Mutex<Option<JoinHandle<()>>>,
}

impl BoundedDispatcher {
    pub fn new(pool: WorkerPool, ctx: &EngineContext) -> Self {
        Self::with_config(pool, ctx, DispatcherConfig::default())
    }

    pub fn with_config(pool: WorkerPool, ctx: &EngineContext, config: DispatcherConfig) -> Self {
        let (tx, rx) = bounded(QUEUE_CAPACITY);
        Self {
            shared: Arc::new(DispatchShared {
                tx,
                rx,
                permits: PermitPool::new(ctx.permit_capacity()),
                pool,
                config,
                shutdown: AtomicBool::new(false),
                terminated: AtomicBool::new(false),
                loop_thread: Mutex::new(None),
            }),
        }
    }

    /// Submit a unit of work. Returns `true` when the work was queued for
    /// asynchronous execution, `false` when the queue was full and the work
    /// already ran synchronously on the calling thread. Submission never
    /// fails; it degrades to inline execution instead.
    pub fn submit<F>(&self, privileged: bool, work: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let work = PendingWork {
            run: Box::new(work),
            privileged,
        };
        match self.shared.tx.try_send(work) {
            Ok(()) => {
                self.ensure_loop_started();
                true
            }
            Err(TrySendError::Full(work)) => {
                tracing::debug!(
                    capacity = QUEUE_CAPACITY,
                    privileged = work.privileged,
                    "Dispatch queue full, running work on the submitting thread"
                );
                (work.run)();
                false
            }
            // Unreachable while `shared` holds the receiver; treated the
            // same as overflow so the work still runs.
            Err(TrySendError::Disconnected(work)) => {
                (work.run)();
                false
            }
        }
    }

    /// Start the dispatch loop on first use. Idempotent; guarded by the
    /// handle mutex rather than a double-checked flag.
    fn ensure_loop_started(&self) {
        let mut handle = self.shared.loop_thread.lock();
        if handle.is_some() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("gatehouse-dispatch".to_string())
            .spawn(move || dispatch_loop(shared));
        match spawned {
            Ok(h) => *handle = Some(h),
            Err(e) => {
                // Queued work will be picked up if a later submit manages to
                // start the loop; callers keep their overflow fallback.
                tracing::error!(error = %e, "Failed to start dispatch loop thread");
            }
        }
    }

    /// Stop the service contract for new callers. Already-accepted work is
    /// drained by [`await_termination`].
    ///
    /// [`await_termination`]: BoundedDispatcher::await_termination
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
    }

    /// Immediate variant of [`shutdown`]. Nothing is cancelled; in-flight
    /// and queued work still runs.
    ///
    /// [`shutdown`]: BoundedDispatcher::shutdown
    pub fn shutdown_now(&self) {
        self.shutdown();
    }

    /// Block until every permit is back and the queue is empty, then stop
    /// and join the dispatch thread.
    ///
    /// The drain wait is bounded by the configured internal deadline, not by
    /// `caller_timeout`; the parameter mirrors the conventional signature
    /// and is only reported in traces.
    pub fn await_termination(&self, caller_timeout: Duration) -> Result<(), AppError> {
        let deadline = self.shared.config.drain_deadline();
        tracing::debug!(
            caller_timeout_ms = caller_timeout.as_millis() as u64,
            drain_deadline_ms = deadline.as_millis() as u64,
            "Awaiting dispatcher termination"
        );
        let start = Instant::now();
        while self.shared.permits.outstanding() > 0 || !self.shared.rx.is_empty() {
            if start.elapsed() >= deadline {
                return Err(AppError::ShutdownTimeout {
                    waited_ms: deadline.as_millis() as u64,
                    outstanding: self.shared.permits.outstanding(),
                    queued: self.shared.rx.len(),
                });
            }
            thread::sleep(DRAIN_POLL);
        }

        self.shared.terminated.store(true, Ordering::Release);
        if let Some(handle) = self.shared.loop_thread.lock().take() {
            // Kick the loop out of its bounded poll so it observes
            // `terminated` without waiting out the full poll interval.
            let _ = self.shared.tx.try_send(PendingWork {
                run: Box::new(|| {}),
                privileged: true,
            });
            let _ = handle.join();
        }
        tracing::info!("Dispatcher terminated");
        Ok(())
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.terminated.load(Ordering::Acquire)
    }

    /// Capacity of the ordinary-work permit pool.
    pub fn max_available(&self) -> usize {
        self.shared.permits.capacity()
    }

    /// Permits currently held by in-flight ordinary work.
    pub fn outstanding_permits(&self) -> usize {
        self.shared.permits.outstanding()
    }

    /// Items waiting in the dispatch queue.
    pub fn queued(&self) -> usize {
        self.shared.rx.len()
    }
}

fn dispatch_loop(shared: Arc<DispatchShared>) {
    tracing::debug!("Dispatch loop started");
    while !shared.terminated.load(Ordering::Acquire) {
        let work = match shared.rx.recv_timeout(QUEUE_POLL) {
            Ok(work) => work,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let permit = if work.privileged {
            None
        } else {
            // Blocks until an ordinary slot frees up; this is the point
            // that enforces the concurrency bound.
            Some(shared.permits.acquire())
        };
        let hook = shared.config.on_task_complete.clone();
        shared.pool.execute(move || {
            let _done = CompletionGuard { permit, hook };
            (work.run)();
        });
    }
    tracing::debug!("Dispatch loop exited");
}

/// Releases the permit (if any) and fires the completion hook exactly once,
/// even when the work panics.
struct CompletionGuard {
    permit: Option<Permit>,
    hook: Option<TaskCompleteHook>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.permit.take();
        if let Some(hook) = &self.hook {
            hook();
        }
    }
}
