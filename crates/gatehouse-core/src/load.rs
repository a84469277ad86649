//! Load sampler seam for the admission filter.
//!
//! Implementations report this process's own CPU utilization and the host's
//! load average. The admission filter polls the sampler on every ordinary
//! request; implementations must be cheap and must never block on I/O.

/// Point-in-time load reading. Not persisted; recomputed per evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSample {
    /// Average CPU utilization of this process across cores, 0-100+.
    pub self_cpu_percent: f64,
    /// OS-reported one-minute load average, `None` where unsupported.
    pub host_load_average: Option<f64>,
}

/// Source of load readings consumed by the admission filter.
///
/// Pure read interface, no mutation. Where the OS cannot report a load
/// average, `host_load_average` returns `None`; the caller substitutes a
/// neutral default (fail open, not closed).
pub trait LoadSampler: Send + Sync {
    /// Average CPU utilization of this process's threads, as a 0-100+ percentage.
    fn self_cpu_percent(&self) -> f64;

    /// Host-wide one-minute load average, or `None` where unsupported.
    fn host_load_average(&self) -> Option<f64>;

    fn sample(&self) -> LoadSample {
        LoadSample {
            self_cpu_percent: self.self_cpu_percent(),
            host_load_average: self.host_load_average(),
        }
    }
}
