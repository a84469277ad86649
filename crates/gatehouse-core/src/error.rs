//! Error types module
//!
//! Unified error type for the control plane. Every failure mode degrades to
//! increased latency, rejection, or inline execution; none of these errors
//! terminates the process.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// Errors self-describe their HTTP response characteristics; the HTTP
/// conversion itself lives in the binary crate.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "CAPACITY_EXHAUSTED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Concurrent request limit reached: {in_flight} in flight, ceiling {ceiling}")]
    CapacityExhausted { in_flight: usize, ceiling: usize },

    #[error("Shutdown drain deadline exceeded after {waited_ms}ms: {outstanding} permits outstanding, {queued} items queued")]
    ShutdownTimeout {
        waited_ms: u64,
        outstanding: usize,
        queued: usize,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Static metadata per variant: (http_status, error_code, recoverable, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, LogLevel) {
    match err {
        AppError::CapacityExhausted { .. } => {
            (503, "CAPACITY_EXHAUSTED", true, LogLevel::Warn)
        }
        AppError::ShutdownTimeout { .. } => (500, "SHUTDOWN_TIMEOUT", false, LogLevel::Error),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, LogLevel::Debug),
        AppError::Config(_) => (500, "CONFIG_ERROR", false, LogLevel::Error),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::CapacityExhausted { .. } => {
                "Server is under heavy load. Please retry shortly.".to_string()
            }
            AppError::ShutdownTimeout { .. } => "Shutdown did not complete in time".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Config(msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_capacity_exhausted() {
        let err = AppError::CapacityExhausted {
            in_flight: 10,
            ceiling: 10,
        };
        assert_eq!(err.http_status_code(), 503);
        assert_eq!(err.error_code(), "CAPACITY_EXHAUSTED");
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert!(err.to_string().contains("10 in flight"));
    }

    #[test]
    fn test_error_metadata_shutdown_timeout() {
        let err = AppError::ShutdownTimeout {
            waited_ms: 10_000,
            outstanding: 1,
            queued: 0,
        };
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "SHUTDOWN_TIMEOUT");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Error);
        assert!(err.to_string().contains("1 permits outstanding"));
    }

    #[test]
    fn test_client_message_hides_internal_detail() {
        let err = AppError::Internal("semaphore poisoned".to_string());
        assert_eq!(err.client_message(), "Internal server error");
    }
}
