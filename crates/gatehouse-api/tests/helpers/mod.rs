//! Shared test fixtures: a scripted load sampler and app assembly.
#![allow(dead_code)] // Not every test binary uses every helper

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;

use gatehouse_api::setup::routes::build_router;
use gatehouse_api::{AdmissionControl, AppState};
use gatehouse_core::{Config, EngineContext, LoadSampler};
use gatehouse_worker::{BoundedDispatcher, DispatcherConfig, WorkerPool, WorkerPoolConfig};

/// Sampler whose readings the test scripts; counts how often it is consulted.
pub struct ScriptedSampler {
    cpu_bits: AtomicU64,
    load_bits: AtomicU64,
    supported: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedSampler {
    pub fn new(cpu: f64, load: f64) -> Arc<Self> {
        Arc::new(Self {
            cpu_bits: AtomicU64::new(cpu.to_bits()),
            load_bits: AtomicU64::new(load.to_bits()),
            supported: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_cpu(&self, cpu: f64) {
        self.cpu_bits.store(cpu.to_bits(), Ordering::Relaxed);
    }

    pub fn set_load(&self, load: f64) {
        self.load_bits.store(load.to_bits(), Ordering::Relaxed);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl LoadSampler for ScriptedSampler {
    fn self_cpu_percent(&self) -> f64 {
        self.calls.fetch_add(1, Ordering::Relaxed);
        f64::from_bits(self.cpu_bits.load(Ordering::Relaxed))
    }

    fn host_load_average(&self) -> Option<f64> {
        self.supported
            .load(Ordering::Relaxed)
            .then(|| f64::from_bits(self.load_bits.load(Ordering::Relaxed)))
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub sampler: Arc<ScriptedSampler>,
}

pub fn test_config(max_requests: usize) -> Config {
    Config {
        server_port: 0,
        environment: "test".to_string(),
        max_concurrent_requests: max_requests,
        suspend_ms: 150,
        wait_ms: 25,
        asset_prefix: "/assets/".to_string(),
        worker_core_threads: 0,
        worker_max_threads: 8,
        worker_keep_alive_ms: 100,
        shutdown_drain_ms: 2_000,
    }
}

/// Build a test server on 4 scripted processors with an idle sampler.
pub fn setup_test_app(max_requests: usize) -> TestApp {
    let config = test_config(max_requests);
    let ctx = EngineContext::with_processor_count(4);
    let sampler = ScriptedSampler::new(0.0, 0.0);

    let pool = WorkerPool::new(
        WorkerPoolConfig {
            name_prefix: "api-test-worker-".to_string(),
            core_size: config.worker_core_threads,
            max_size: config.worker_max_threads,
            keep_alive: config.worker_keep_alive(),
        },
        ctx.clone(),
    );
    let dispatcher = BoundedDispatcher::with_config(
        pool,
        &ctx,
        DispatcherConfig {
            drain_deadline: Some(config.shutdown_drain()),
            on_task_complete: None,
        },
    );
    let admission = Arc::new(AdmissionControl::new(
        &config,
        &ctx,
        Arc::clone(&sampler) as Arc<dyn LoadSampler>,
    ));
    let state = AppState {
        config: Arc::new(config),
        admission,
        dispatcher,
    };

    let server = TestServer::new(build_router(state.clone())).expect("test server should build");
    TestApp {
        server,
        state,
        sampler,
    }
}

/// Shutdown helper so tests leave no threads behind.
pub fn teardown(app: &TestApp) {
    app.state.dispatcher.shutdown();
    app.state
        .dispatcher
        .await_termination(Duration::from_secs(2))
        .expect("test dispatcher should drain");
}
