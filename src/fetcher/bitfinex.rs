//! Bitfinex public API client.
//!
//! Wraps one reqwest client plus the shared [`RatePacer`]: every request
//! first waits for a pacer slot, then runs through a bounded retry loop
//! with capped exponential backoff. An HTTP 429 additionally pushes the
//! global pacer slot forward so every concurrent worker slows down, not
//! just the one that was rejected.

use crate::backfill::config::{
    escalate_backoff, initial_backoff, MAX_RETRIES, RATE_LIMIT_BACKOFF_FACTOR,
    REQUEST_TIMEOUT_SECS, TRANSPORT_BACKOFF_FACTOR,
};
use crate::backfill::RatePacer;
use crate::fetcher::{FetcherError, FetcherResult, TradeSource};
use crate::Trade;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Production endpoint for the Bitfinex public API.
pub const DEFAULT_BASE_URL: &str = "https://api-pub.bitfinex.com";

/// How much of an error body to keep in logs and error values.
const BODY_SNIPPET_LEN: usize = 200;

/// Rate-limited HTTP client for `/v2/trades/{symbol}/hist`.
pub struct BitfinexClient {
    client: reqwest::Client,
    base_url: String,
    symbol: String,
    pacer: Arc<RatePacer>,
    max_retries: u32,
}

impl BitfinexClient {
    /// Create a client for the production endpoint.
    ///
    /// # Arguments
    /// * `symbol` - Bitfinex trading symbol (e.g., "tBTCUSD")
    /// * `pacer` - Shared rate pacer (one instance per process)
    pub fn new(symbol: impl Into<String>, pacer: Arc<RatePacer>) -> FetcherResult<Self> {
        Self::with_base_url(symbol, DEFAULT_BASE_URL, pacer)
    }

    /// Create a client against an alternate base URL.
    pub fn with_base_url(
        symbol: impl Into<String>,
        base_url: impl Into<String>,
        pacer: Arc<RatePacer>,
    ) -> FetcherResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetcherError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            symbol: symbol.into(),
            pacer,
            max_retries: MAX_RETRIES,
        })
    }

    /// Override the per-request retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Execute one paced, retried GET and return the raw JSON rows.
    ///
    /// Backoff policy per attempt:
    /// - transport error: backoff ×1.5, capped
    /// - HTTP 429: backoff ×2.0, capped; pacer slot pushed forward globally
    /// - other non-2xx: backoff ×1.5, capped
    ///
    /// A payload that does not parse is terminal for the call; it is not retried.
    async fn request_rows(&self, params: &[(&str, String)]) -> FetcherResult<Vec<Value>> {
        let url = format!("{}/v2/trades/{}/hist", self.base_url, self.symbol);
        let mut backoff = initial_backoff();

        for attempt in 1..=self.max_retries {
            self.pacer.acquire().await;

            let response = match self.client.get(&url).query(params).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    backoff = escalate_backoff(backoff, TRANSPORT_BACKOFF_FACTOR);
                    warn!(
                        "Network error: {e}, retry {attempt}/{} in {:.1}s",
                        self.max_retries,
                        backoff.as_secs_f64()
                    );
                    sleep(backoff).await;
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 {
                backoff = escalate_backoff(backoff, RATE_LIMIT_BACKOFF_FACTOR);
                self.pacer.penalize(backoff).await;
                warn!(
                    "Rate limit hit (429), retry {attempt}/{} in {:.1}s",
                    self.max_retries,
                    backoff.as_secs_f64()
                );
                sleep(backoff).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let snippet: String = body.chars().take(BODY_SNIPPET_LEN).collect();
                backoff = escalate_backoff(backoff, TRANSPORT_BACKOFF_FACTOR);
                warn!(
                    "HTTP {status} '{snippet}', retry {attempt}/{} in {:.1}s",
                    self.max_retries,
                    backoff.as_secs_f64()
                );
                sleep(backoff).await;
                continue;
            }

            return response
                .json::<Vec<Value>>()
                .await
                .map_err(|e| FetcherError::ParseError(format!("invalid trade payload: {e}")));
        }

        Err(FetcherError::RetriesExhausted {
            attempts: self.max_retries,
        })
    }
}

#[async_trait]
impl TradeSource for BitfinexClient {
    async fn fetch_page(
        &self,
        start_ms: i64,
        end_ms: i64,
        limit: usize,
    ) -> FetcherResult<Vec<Trade>> {
        let params = [
            ("start", start_ms.to_string()),
            ("end", end_ms.to_string()),
            ("limit", limit.to_string()),
            ("sort", "1".to_string()),
        ];

        debug!(
            "Fetching {} trades page: start={start_ms} end={end_ms} limit={limit}",
            self.symbol
        );

        let rows = self.request_rows(&params).await?;
        let mut trades = parse_trades(rows)?;

        // The endpoint is asked for ascending order, but do not trust it:
        // the pagination cursor depends on it.
        trades.sort_by_key(|trade| trade.mts);

        Ok(trades)
    }
}

/// Parse raw `[ID, MTS, AMOUNT, PRICE]` rows into [`Trade`]s.
pub fn parse_trades(rows: Vec<Value>) -> FetcherResult<Vec<Trade>> {
    let mut trades = Vec::with_capacity(rows.len());

    for row in rows {
        let arr = row
            .as_array()
            .ok_or_else(|| FetcherError::ParseError("trade row is not an array".to_string()))?;

        if arr.len() < 4 {
            return Err(FetcherError::ParseError(format!(
                "expected 4 elements in trade row, got {}",
                arr.len()
            )));
        }

        let id = arr[0]
            .as_i64()
            .ok_or_else(|| FetcherError::ParseError("invalid trade id".to_string()))?;
        let mts = arr[1]
            .as_i64()
            .ok_or_else(|| FetcherError::ParseError("invalid trade timestamp".to_string()))?;
        let amount = parse_decimal(&arr[2], "amount")?;
        let price = parse_decimal(&arr[3], "price")?;

        trades.push(Trade {
            id,
            mts,
            amount,
            price,
        });
    }

    Ok(trades)
}

/// Parse a decimal from a JSON string or number field.
fn parse_decimal(value: &Value, field: &str) -> FetcherResult<Decimal> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(FetcherError::ParseError(format!(
                "invalid {field}: {other}"
            )))
        }
    };

    // Small amounts arrive in scientific notation (e.g. 1e-8)
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| FetcherError::ParseError(format!("invalid {field} '{text}': {e}")))
}
