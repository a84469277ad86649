use gatehouse_api::setup;
use gatehouse_core::Config;
use gatehouse_infra::{init_telemetry, shutdown_telemetry};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_telemetry().map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {e}"))?;

    let config = Config::from_env()?;
    let drain_deadline = config.shutdown_drain();

    let (state, pool, dispatcher) = setup::initialize_app(config);
    let router = setup::routes::build_router(state.clone());

    setup::server::start_server(&state.config, router).await?;

    // The listener is closed; stop accepting background work and drain what
    // was already accepted before stopping the pool.
    dispatcher.shutdown();
    let drain = tokio::task::spawn_blocking(move || dispatcher.await_termination(drain_deadline))
        .await
        .map_err(|e| anyhow::anyhow!("Dispatcher drain task failed: {e}"))?;
    if let Err(e) = drain {
        // Teardown continues; in-flight work past the deadline is abandoned.
        tracing::error!(error = %e, "Dispatcher did not drain before the deadline");
    }

    pool.shutdown();
    tokio::task::spawn_blocking(move || pool.join())
        .await
        .map_err(|e| anyhow::anyhow!("Worker pool join task failed: {e}"))?;

    shutdown_telemetry().await;
    Ok(())
}
