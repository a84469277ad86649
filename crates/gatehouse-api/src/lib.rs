//! Gatehouse API Library
//!
//! HTTP surface of the gatehouse control plane: admission middleware,
//! handlers, application state, and server setup.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod setup;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use middleware::AdmissionControl;
pub use state::AppState;
