//! Application state shared across handlers and middleware.

use std::sync::Arc;

use gatehouse_core::Config;
use gatehouse_worker::BoundedDispatcher;

use crate::middleware::AdmissionControl;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub admission: Arc<AdmissionControl>,
    pub dispatcher: BoundedDispatcher,
}
