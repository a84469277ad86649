pub mod admission;

pub use admission::{admission_middleware, AdmissionControl, InFlightGuard};
pub use gatehouse_infra::request_id_middleware;
