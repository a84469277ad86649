use std::sync::{Arc, Mutex};

use sysinfo::System;

use gatehouse_core::LoadSampler;

/// Load sampler backed by the `sysinfo` crate.
///
/// CPU usage is the average across all cores since the previous refresh;
/// callers poll frequently enough that the window stays short. The load
/// average is read without touching the shared `System` handle.
#[derive(Clone)]
pub struct SystemLoadSampler {
    system: Arc<Mutex<System>>,
}

impl SystemLoadSampler {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();

        Self {
            system: Arc::new(Mutex::new(system)),
        }
    }
}

impl Default for SystemLoadSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadSampler for SystemLoadSampler {
    fn self_cpu_percent(&self) -> f64 {
        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            Err(e) => {
                // Fail open: an unreadable source reads as idle.
                tracing::error!(error = %e, "Failed to acquire system lock for CPU sample");
                return 0.0;
            }
        };
        system.refresh_cpu();

        let cpus = system.cpus();
        if cpus.is_empty() {
            0.0
        } else {
            (cpus.iter().map(|cpu| cpu.cpu_usage()).sum::<f32>() / cpus.len() as f32) as f64
        }
    }

    fn host_load_average(&self) -> Option<f64> {
        let load = System::load_average();
        if load.one >= 0.0 {
            Some(load.one)
        } else {
            None
        }
    }
}
