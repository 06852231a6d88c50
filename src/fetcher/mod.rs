//! Remote trade source implementations

use crate::Trade;
use async_trait::async_trait;

mod bitfinex;

pub use bitfinex::{parse_trades, BitfinexClient, DEFAULT_BASE_URL};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),

    /// Non-success HTTP status
    #[error("HTTP error {status}: {body}")]
    HttpError {
        /// Status code returned by the server
        status: u16,
        /// Leading fragment of the response body
        body: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Retry budget exhausted for a single request
    #[error("retries exhausted after {attempts} attempt(s)")]
    RetriesExhausted {
        /// Number of attempts made before giving up
        attempts: u32,
    },

    /// Client construction error
    #[error("client error: {0}")]
    ClientError(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// A paginated source of historical trades.
///
/// One call fetches at most one page. Callers paginate by advancing their
/// start cursor past the last returned timestamp; for that to terminate the
/// source must return trades in ascending `mts` order.
#[async_trait]
pub trait TradeSource: Send + Sync {
    /// Fetch up to `limit` trades executed in `[start_ms, end_ms)`,
    /// ascending by timestamp.
    async fn fetch_page(&self, start_ms: i64, end_ms: i64, limit: usize)
        -> FetcherResult<Vec<Trade>>;
}
