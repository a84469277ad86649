//! Engine context: process-level facts and hooks, constructed once at startup
//! and injected into every component. Nothing in the control plane reads
//! processor count or registers cleanup behavior through globals.

use std::sync::Arc;

/// Hook invoked by worker-pool threads, exactly once per thread exit.
pub type ThreadExitHook = Arc<dyn Fn() + Send + Sync>;

/// Shared process context.
///
/// Construction order at startup: telemetry, config, `EngineContext`, worker
/// pool, dispatcher, admission state. Components receive the context by
/// value (it is cheap to clone) and never look anything up globally.
#[derive(Clone)]
pub struct EngineContext {
    processor_count: usize,
    thread_exit_hook: Option<ThreadExitHook>,
}

impl EngineContext {
    /// Build a context from the detected processor count.
    pub fn new() -> Self {
        let processor_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            processor_count,
            thread_exit_hook: None,
        }
    }

    /// Build a context with an explicit processor count. Used by tests and
    /// by deployments that cap the process below the host's core count.
    pub fn with_processor_count(processor_count: usize) -> Self {
        Self {
            processor_count: processor_count.max(1),
            thread_exit_hook: None,
        }
    }

    /// Attach a hook run by each worker-pool thread on exit.
    pub fn with_thread_exit_hook(mut self, hook: ThreadExitHook) -> Self {
        self.thread_exit_hook = Some(hook);
        self
    }

    pub fn processor_count(&self) -> usize {
        self.processor_count
    }

    pub fn thread_exit_hook(&self) -> Option<&ThreadExitHook> {
        self.thread_exit_hook.as_ref()
    }

    /// Capacity of the ordinary-work permit pool.
    pub fn permit_capacity(&self) -> usize {
        self.processor_count.max(3)
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("processor_count", &self.processor_count)
            .field("thread_exit_hook", &self.thread_exit_hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permit_capacity_floors_at_three() {
        assert_eq!(EngineContext::with_processor_count(1).permit_capacity(), 3);
        assert_eq!(EngineContext::with_processor_count(2).permit_capacity(), 3);
        assert_eq!(EngineContext::with_processor_count(3).permit_capacity(), 3);
        assert_eq!(EngineContext::with_processor_count(8).permit_capacity(), 8);
    }

    #[test]
    fn zero_processor_count_is_clamped() {
        let ctx = EngineContext::with_processor_count(0);
        assert_eq!(ctx.processor_count(), 1);
    }
}
