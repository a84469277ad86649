pub mod routes;
pub mod server;

use std::sync::Arc;

use gatehouse_core::{Config, EngineContext};
use gatehouse_infra::SystemLoadSampler;
use gatehouse_worker::{BoundedDispatcher, DispatcherConfig, WorkerPool, WorkerPoolConfig};

use crate::middleware::AdmissionControl;
use crate::state::AppState;

/// Assemble the control plane in dependency order: context, pool,
/// dispatcher, admission state.
pub fn initialize_app(config: Config) -> (AppState, WorkerPool, BoundedDispatcher) {
    let ctx = EngineContext::new();
    tracing::info!(
        processor_count = ctx.processor_count(),
        permit_capacity = ctx.permit_capacity(),
        max_concurrent_requests = config.max_concurrent_requests,
        "Initializing gatehouse"
    );

    let pool = WorkerPool::new(
        WorkerPoolConfig {
            name_prefix: "gatehouse-worker-".to_string(),
            core_size: config.worker_core_threads,
            max_size: config.worker_max_threads,
            keep_alive: config.worker_keep_alive(),
        },
        ctx.clone(),
    );
    let dispatcher = BoundedDispatcher::with_config(
        pool.clone(),
        &ctx,
        DispatcherConfig {
            drain_deadline: Some(config.shutdown_drain()),
            on_task_complete: None,
        },
    );
    let admission = Arc::new(AdmissionControl::new(
        &config,
        &ctx,
        Arc::new(SystemLoadSampler::new()),
    ));

    let state = AppState {
        config: Arc::new(config),
        admission,
        dispatcher: dispatcher.clone(),
    };
    (state, pool, dispatcher)
}
