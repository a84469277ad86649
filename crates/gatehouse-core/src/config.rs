//! Configuration module
//!
//! Environment-driven configuration for the admission filter, the background
//! dispatcher, and the worker pool. Every knob has a default so a bare
//! environment boots a working server.

use std::env;
use std::time::Duration;

/// Gatehouse configuration, loaded once at startup and shared read-only.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    /// Configured (original) ceiling on concurrently admitted ordinary requests.
    pub max_concurrent_requests: usize,
    /// Total budget a request may stay suspended waiting for a free slot.
    pub suspend_ms: u64,
    /// Interval between slot re-checks while suspended.
    pub wait_ms: u64,
    /// Path prefix that bypasses admission control entirely.
    pub asset_prefix: String,
    /// Worker pool: threads kept alive even when idle.
    pub worker_core_threads: usize,
    /// Worker pool: hard ceiling on pool threads.
    pub worker_max_threads: usize,
    /// Worker pool: idle lifetime of threads above the core size.
    pub worker_keep_alive_ms: u64,
    /// Dispatcher: internal deadline for draining in-flight work at shutdown.
    pub shutdown_drain_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const SERVER_PORT: u16 = 4000;
        const MAX_CONCURRENT_REQUESTS: usize = 1000;
        const SUSPEND_MS: u64 = 15_000;
        const WAIT_MS: u64 = 2_000;
        const WORKER_CORE_THREADS: usize = 2;
        const WORKER_MAX_THREADS: usize = 24;
        const WORKER_KEEP_ALIVE_MS: u64 = 5_000;
        const SHUTDOWN_DRAIN_MS: u64 = 10_000;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            max_concurrent_requests: env::var("GATEHOUSE_MAX_CONCURRENT_REQUESTS")
                .unwrap_or_else(|_| MAX_CONCURRENT_REQUESTS.to_string())
                .parse()
                .unwrap_or(MAX_CONCURRENT_REQUESTS),
            suspend_ms: env::var("GATEHOUSE_SUSPEND_MS")
                .unwrap_or_else(|_| SUSPEND_MS.to_string())
                .parse()
                .unwrap_or(SUSPEND_MS),
            wait_ms: env::var("GATEHOUSE_WAIT_MS")
                .unwrap_or_else(|_| WAIT_MS.to_string())
                .parse()
                .unwrap_or(WAIT_MS),
            asset_prefix: env::var("GATEHOUSE_ASSET_PREFIX")
                .unwrap_or_else(|_| "/assets/".to_string()),
            worker_core_threads: env::var("GATEHOUSE_WORKER_CORE_THREADS")
                .unwrap_or_else(|_| WORKER_CORE_THREADS.to_string())
                .parse()
                .unwrap_or(WORKER_CORE_THREADS),
            worker_max_threads: env::var("GATEHOUSE_WORKER_MAX_THREADS")
                .unwrap_or_else(|_| WORKER_MAX_THREADS.to_string())
                .parse()
                .unwrap_or(WORKER_MAX_THREADS),
            worker_keep_alive_ms: env::var("GATEHOUSE_WORKER_KEEP_ALIVE_MS")
                .unwrap_or_else(|_| WORKER_KEEP_ALIVE_MS.to_string())
                .parse()
                .unwrap_or(WORKER_KEEP_ALIVE_MS),
            shutdown_drain_ms: env::var("GATEHOUSE_SHUTDOWN_DRAIN_MS")
                .unwrap_or_else(|_| SHUTDOWN_DRAIN_MS.to_string())
                .parse()
                .unwrap_or(SHUTDOWN_DRAIN_MS),
        };

        if config.max_concurrent_requests < 2 {
            return Err(anyhow::anyhow!(
                "GATEHOUSE_MAX_CONCURRENT_REQUESTS must be at least 2"
            ));
        }
        if config.worker_max_threads == 0 {
            return Err(anyhow::anyhow!(
                "GATEHOUSE_WORKER_MAX_THREADS must be at least 1"
            ));
        }
        if config.worker_core_threads > config.worker_max_threads {
            return Err(anyhow::anyhow!(
                "GATEHOUSE_WORKER_CORE_THREADS cannot exceed GATEHOUSE_WORKER_MAX_THREADS"
            ));
        }

        Ok(config)
    }

    pub fn suspend_budget(&self) -> Duration {
        Duration::from_millis(self.suspend_ms)
    }

    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }

    pub fn worker_keep_alive(&self) -> Duration {
        Duration::from_millis(self.worker_keep_alive_ms)
    }

    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_millis(self.shutdown_drain_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_apply_without_env() {
        let _env = ENV_LOCK.lock().unwrap();
        let config = Config::from_env().expect("default config should load");
        assert_eq!(config.max_concurrent_requests, 1000);
        assert_eq!(config.suspend_ms, 15_000);
        assert_eq!(config.wait_ms, 2_000);
        assert_eq!(config.asset_prefix, "/assets/");
        assert_eq!(config.shutdown_drain(), Duration::from_millis(10_000));
    }

    #[test]
    fn malformed_optional_value_falls_back_to_default() {
        let _env = ENV_LOCK.lock().unwrap();
        std::env::set_var("GATEHOUSE_SUSPEND_MS", "not-a-number");
        let config = Config::from_env().expect("config should still load");
        assert_eq!(config.suspend_ms, 15_000);
        std::env::remove_var("GATEHOUSE_SUSPEND_MS");
    }

    #[test]
    fn ceiling_below_floor_is_rejected() {
        let _env = ENV_LOCK.lock().unwrap();
        std::env::set_var("GATEHOUSE_MAX_CONCURRENT_REQUESTS", "1");
        let result = Config::from_env();
        std::env::remove_var("GATEHOUSE_MAX_CONCURRENT_REQUESTS");
        assert!(result.is_err());
    }
}
