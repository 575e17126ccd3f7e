//! Planner configuration structures and loaders.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Bounded-backoff policy for idempotent source reads.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Configuration required to build a [`crate::Planner`].
#[derive(Clone, Debug, Default)]
pub struct PlannerConfig {
    /// Database file for the roster and result caches; `None` keeps them in
    /// memory for the lifetime of the process.
    pub database_path: Option<PathBuf>,
    pub retry: RetryPolicy,
}

impl PlannerConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `FARM_DATABASE_PATH` - SQLite file backing the caches (default: in-memory)
    /// - `FARM_RETRY_ATTEMPTS` - attempts per idempotent source read (default: 3)
    /// - `FARM_RETRY_BASE_DELAY_MS` - backoff base delay in milliseconds (default: 100)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.database_path = env::var("FARM_DATABASE_PATH").ok().map(PathBuf::from);

        if let Some(attempts) = read_env::<u32>("FARM_RETRY_ATTEMPTS") {
            config.retry.attempts = attempts.max(1);
        }

        if let Some(delay) = read_env::<u64>("FARM_RETRY_BASE_DELAY_MS") {
            config.retry.base_delay = Duration::from_millis(delay);
        }

        config
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.parse().ok())
}
