//! Always-allow asset surface.
//!
//! Requests under the asset prefix bypass admission control; the handler
//! itself has nothing to serve in this deployment and reports not-found.

use axum::extract::Path;
use axum::response::IntoResponse;

use gatehouse_core::AppError;

use crate::error::HttpAppError;

pub async fn get_asset(Path(path): Path<String>) -> impl IntoResponse {
    HttpAppError(AppError::NotFound(format!("asset not bundled: {path}")))
}
