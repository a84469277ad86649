//! Background job submission.
//!
//! The handler side of the control flow: application code hands units of
//! work to the bounded dispatcher, which gates them by permit and queue.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    /// Simulated work duration. Real deployments register job kinds instead.
    #[serde(default)]
    pub duration_ms: u64,
    /// Privileged jobs bypass the ordinary-work permit gate.
    #[serde(default)]
    pub privileged: bool,
}

#[derive(Debug, Serialize)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    /// `false` means the queue was full and the job already ran inline.
    pub queued: bool,
    pub privileged: bool,
}

pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitJobRequest>,
) -> (StatusCode, Json<SubmitJobResponse>) {
    let job_id = Uuid::new_v4();
    let duration = Duration::from_millis(request.duration_ms);

    let queued = state.dispatcher.submit(request.privileged, move || {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
        tracing::info!(job_id = %job_id, "Job finished");
    });

    tracing::info!(
        job_id = %job_id,
        queued,
        privileged = request.privileged,
        "Job submitted"
    );
    (
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            job_id,
            queued,
            privileged: request.privileged,
        }),
    )
}
