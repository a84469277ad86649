//! Control-plane introspection.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub environment: String,
    pub admission: AdmissionStatus,
    pub dispatcher: DispatcherStatus,
}

#[derive(Debug, Serialize)]
pub struct AdmissionStatus {
    pub original_ceiling: usize,
    pub current_ceiling: usize,
    pub in_flight: usize,
}

#[derive(Debug, Serialize)]
pub struct DispatcherStatus {
    pub max_available: usize,
    pub outstanding_permits: usize,
    pub queued: usize,
    pub shutdown: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        environment: state.config.environment.clone(),
        admission: AdmissionStatus {
            original_ceiling: state.admission.original_ceiling(),
            current_ceiling: state.admission.current_ceiling(),
            in_flight: state.admission.in_flight(),
        },
        dispatcher: DispatcherStatus {
            max_available: state.dispatcher.max_available(),
            outstanding_permits: state.dispatcher.outstanding_permits(),
            queued: state.dispatcher.queued(),
            shutdown: state.dispatcher.is_shutdown(),
        },
    })
}
