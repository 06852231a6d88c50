//! Backfill configuration constants and the backoff policy.

use std::time::Duration;

/// Minimum interval between granted request slots, shared by all workers
/// (~14 requests/minute, the externally imposed ceiling).
pub const RATE_LIMIT_INTERVAL_MS: u64 = 4_200;

/// Cap on the per-request backoff delay.
pub const MAX_BACKOFF_MS: u64 = 20_000;

/// Maximum attempts for a single request before its window is abandoned.
pub const MAX_RETRIES: u32 = 5;

/// Maximum trades per API call (server-side limit of the endpoint).
pub const MAX_PAGE_LIMIT: usize = 10_000;

/// Per-request network timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of concurrent period workers.
pub const DEFAULT_WORKERS: usize = 8;

/// Flush the output writer every N trades.
pub const FLUSH_INTERVAL: u64 = 1_000;

/// Backoff growth factor for transport and non-429 HTTP errors.
pub const TRANSPORT_BACKOFF_FACTOR: f64 = 1.5;

/// Backoff growth factor for HTTP 429 responses.
pub const RATE_LIMIT_BACKOFF_FACTOR: f64 = 2.0;

/// Starting backoff for a fresh request: one rate-limit interval.
pub fn initial_backoff() -> Duration {
    Duration::from_millis(RATE_LIMIT_INTERVAL_MS)
}

/// Grow a backoff delay by `factor`, capped at [`MAX_BACKOFF_MS`].
pub fn escalate_backoff(current: Duration, factor: f64) -> Duration {
    current
        .mul_f64(factor)
        .min(Duration::from_millis(MAX_BACKOFF_MS))
}
