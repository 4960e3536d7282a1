use std::time::Duration;

/// Booking engine tuning, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Longest wait for a (member, date) booking lock.
    pub lock_timeout: Duration,
    /// Extra attempts after a contention failure before it is surfaced.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub retry_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2000),
            max_retries: 3,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `BOOKING_LOCK_TIMEOUT_MS`  | `2000`  |
    /// | `BOOKING_MAX_RETRIES`      | `3`     |
    /// | `BOOKING_RETRY_BACKOFF_MS` | `50`    |
    pub fn from_env() -> Self {
        let lock_timeout_ms: u64 = std::env::var("BOOKING_LOCK_TIMEOUT_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("BOOKING_LOCK_TIMEOUT_MS must be a valid u64");

        let max_retries: u32 = std::env::var("BOOKING_MAX_RETRIES")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("BOOKING_MAX_RETRIES must be a valid u32");

        let retry_backoff_ms: u64 = std::env::var("BOOKING_RETRY_BACKOFF_MS")
            .unwrap_or_else(|_| "50".into())
            .parse()
            .expect("BOOKING_RETRY_BACKOFF_MS must be a valid u64");

        Self {
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            max_retries,
            retry_backoff: Duration::from_millis(retry_backoff_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}
