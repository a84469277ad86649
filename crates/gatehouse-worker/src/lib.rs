//! Background execution for gatehouse: a bounded worker pool with a
//! synchronous hand-off and caller-runs backstop, fronted by a bounded
//! dispatcher that gates ordinary work behind a counting permit pool.
//!
//! Shutdown: [`BoundedDispatcher::shutdown`] stops the service contract for
//! new callers; [`BoundedDispatcher::await_termination`] drains in-flight
//! work under an internal deadline. The pool is shut down last, after the
//! dispatcher has drained.

pub mod dispatch;
pub mod permits;
pub mod pool;

pub use dispatch::{BoundedDispatcher, DispatcherConfig, QUEUE_CAPACITY};
pub use permits::{Permit, PermitPool};
pub use pool::{WorkerPool, WorkerPoolConfig};
