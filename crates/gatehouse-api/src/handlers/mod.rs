pub mod assets;
pub mod jobs;
pub mod status;

use axum::Json;

/// Liveness probe.
pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
