//! Route configuration and setup

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{admission_middleware, request_id_middleware};
use crate::state::AppState;

/// Build the application router with the admission layer in front of every
/// route. Layer order (outermost first): request id, trace, admission.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/v0/status", get(handlers::status::get_status))
        .route("/api/v0/jobs", post(handlers::jobs::submit_job))
        .route("/assets/{*path}", get(handlers::assets::get_asset))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            admission_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}
