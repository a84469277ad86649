//! Load-adaptive admission control for inbound requests.
//!
//! Ordinary requests pay a load evaluation on every pass: high process CPU
//! shrinks the admission ceiling; a clear host-load signal restores it.
//! Requests from internal sources and always-allow paths skip all of it.
//!
//! The ceiling is written with plain atomic stores. Concurrent evaluators
//! can interleave a shrink and a restore; the next request re-evaluates and
//! corrects, so the window is one request wide.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::time::Instant;

use gatehouse_core::{AppError, Config, EngineContext, LoadSampler};

use crate::state::AppState;

/// Header marking a request as originating from a trusted internal source.
pub const REQUEST_SOURCE_HEADER: &str = "x-request-source";
pub const INTERNAL_SOURCE: &str = "internal";

/// Process CPU percentage above which the ceiling shrinks.
pub const SELF_LOAD_HIGH: f64 = 99.0;

/// Lowest value the ceiling can be reduced to. Never throttle to zero.
pub const MIN_CEILING: usize = 2;

const REDUCTION_FACTOR: f64 = 0.6;

/// `max(2, floor(current * 0.6))`
fn reduced_ceiling(current: usize) -> usize {
    MIN_CEILING.max((current as f64 * REDUCTION_FACTOR) as usize)
}

pub struct AdmissionControl {
    original: usize,
    current: AtomicUsize,
    in_flight: AtomicUsize,
    suspend_budget: Duration,
    wait_interval: Duration,
    asset_prefix: String,
    processor_count: usize,
    sampler: Arc<dyn LoadSampler>,
    load_average_warned: AtomicBool,
}

impl AdmissionControl {
    pub fn new(config: &Config, ctx: &EngineContext, sampler: Arc<dyn LoadSampler>) -> Self {
        Self {
            original: config.max_concurrent_requests,
            current: AtomicUsize::new(config.max_concurrent_requests),
            in_flight: AtomicUsize::new(0),
            suspend_budget: config.suspend_budget(),
            wait_interval: config.wait_interval(),
            asset_prefix: config.asset_prefix.clone(),
            processor_count: ctx.processor_count(),
            sampler,
            load_average_warned: AtomicBool::new(false),
        }
    }

    pub fn original_ceiling(&self) -> usize {
        self.original
    }

    pub fn current_ceiling(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// A request is privileged when it carries the internal-source header or
    /// targets the always-allow path prefix.
    pub fn is_privileged(&self, headers: &HeaderMap, path: &str) -> bool {
        if path.starts_with(&self.asset_prefix) {
            return true;
        }
        headers
            .get(REQUEST_SOURCE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|source| source == INTERNAL_SOURCE)
    }

    /// Run one load evaluation, possibly adjusting the ceiling.
    ///
    /// Called on every ordinary request; not sampled or cached.
    pub fn evaluate_load(&self) {
        let self_load = self.sampler.self_cpu_percent();
        if self_load > SELF_LOAD_HIGH {
            tracing::info!(self_load, "Process load is high");
            self.shrink_ceiling();
            return;
        }

        let host_load = match self.sampler.host_load_average() {
            Some(load) => load,
            None => {
                if !self.load_average_warned.swap(true, Ordering::Relaxed) {
                    tracing::warn!("Host load average not supported on this platform");
                }
                0.0
            }
        };
        let cores = self.processor_count as f64;
        let per_core_load = host_load / cores;
        // Comparing a per-core ratio against the core count is inherited
        // behavior; on multi-core hosts this branch requires load far past
        // saturation. See DESIGN.md before changing the threshold.
        if per_core_load > cores {
            self.shrink_ceiling();
        } else if per_core_load < cores && self.current_ceiling() != self.original {
            self.current.store(self.original, Ordering::Relaxed);
            tracing::info!(
                max_requests = self.original,
                "Restored max concurrent requests to original value"
            );
        }
        tracing::debug!(per_core_load, "External request, load evaluated");
    }

    fn shrink_ceiling(&self) {
        let current = self.current_ceiling();
        if current > MIN_CEILING {
            let reduced = reduced_ceiling(current);
            self.current.store(reduced, Ordering::Relaxed);
            tracing::info!(max_requests = reduced, "Reduced max concurrent requests");
        }
    }

    /// Optimistic slot reservation against the current ceiling.
    pub fn try_admit(self: &Arc<Self>) -> Option<InFlightGuard> {
        let ceiling = self.current_ceiling();
        let prev = self.in_flight.fetch_add(1, Ordering::SeqCst);
        if prev >= ceiling {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            None
        } else {
            Some(InFlightGuard {
                control: Arc::clone(self),
            })
        }
    }

    /// Admit an ordinary request, suspending the caller up to the configured
    /// budget while slots are contended. The ceiling is re-read on every
    /// check, so a concurrent restore widens the gate mid-wait.
    pub async fn admit_ordinary(self: &Arc<Self>) -> Result<InFlightGuard, AppError> {
        if let Some(guard) = self.try_admit() {
            return Ok(guard);
        }
        let deadline = Instant::now() + self.suspend_budget;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AppError::CapacityExhausted {
                    in_flight: self.in_flight(),
                    ceiling: self.current_ceiling(),
                });
            }
            tokio::time::sleep(remaining.min(self.wait_interval)).await;
            if let Some(guard) = self.try_admit() {
                return Ok(guard);
            }
        }
    }
}

/// Releases the admitted request's slot when the response completes.
pub struct InFlightGuard {
    control: Arc<AdmissionControl>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.control.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Admission middleware: classify, evaluate load, then gate ordinary
/// requests behind the admission primitive.
pub async fn admission_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let control = &state.admission;
    if control.is_privileged(request.headers(), request.uri().path()) {
        tracing::debug!(path = %request.uri().path(), "Internal request, allow");
        return next.run(request).await;
    }

    control.evaluate_load();
    match control.admit_ordinary().await {
        Ok(guard) => {
            let response = next.run(request).await;
            drop(guard);
            response
        }
        Err(err) => crate::error::HttpAppError(err).into_response(),
    }
}
