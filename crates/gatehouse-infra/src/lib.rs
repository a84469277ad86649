//! Gatehouse Infrastructure Library
//!
//! Shared infrastructure components:
//! - Middleware (request ID)
//! - Telemetry initialization
//! - System load sampling

pub mod middleware;
pub mod sampling;
pub mod telemetry;

// Re-export commonly used types
pub use middleware::{get_request_id, request_id_middleware, RequestId};
pub use sampling::SystemLoadSampler;
pub use telemetry::{init_telemetry, shutdown_telemetry};
