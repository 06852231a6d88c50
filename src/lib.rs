//! # Bitfinex Trades Backfiller
//!
//! A library for backfilling the complete historical trade record of a
//! Bitfinex symbol into per-month local CSV files, safely resumable across
//! repeated runs.
//!
//! ## Features
//!
//! - **Gap detection**: each run re-scans the existing monthly files and
//!   fetches only the calendar days that have no trades yet
//! - **Global rate limiting**: one request pacer shared by all concurrent
//!   workers, with adaptive backoff after server rate-limit responses
//! - **Cursor pagination**: ascending time-cursor paging against the
//!   `/v2/trades/{symbol}/hist` endpoint
//! - **Per-month isolation**: one worker per calendar month; a failed month
//!   never cancels or corrupts the others
//!
//! ## Quick Start
//!
//! ```no_run
//! use bitfinex_backfill::backfill::{Orchestrator, RatePacer};
//! use bitfinex_backfill::fetcher::BitfinexClient;
//! use bitfinex_backfill::timeline::TimeRange;
//! use chrono::{TimeZone, Utc};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pacer = Arc::new(RatePacer::with_defaults());
//! let client = Arc::new(BitfinexClient::new("tBTCUSD", pacer)?);
//!
//! let span = TimeRange::new(
//!     Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2020, 4, 1, 0, 0, 0).unwrap(),
//! );
//!
//! let orchestrator = Orchestrator::new(client, "tBTCUSD", "./bitfinex_data".into(), 8);
//! let summary = orchestrator.run(&span).await;
//! println!("trades written: {}", summary.total_trades);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`timeline`] - Half-open UTC time ranges and calendar-month partitioning
//! - [`coverage`] - Inspection of existing monthly files and missing-day computation
//! - [`fetcher`] - Rate-limited HTTP client for the Bitfinex public API
//! - [`backfill`] - Range fetch loop, per-month workers, and the orchestrator
//! - [`output`] - Append-only CSV sink and deterministic period paths
//! - [`cli`] - Command-line interface

#![warn(missing_docs)]
#![warn(clippy::all)]

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Backfill orchestration: range fetching, per-month workers, rate pacing
pub mod backfill;

/// CLI command implementations
pub mod cli;

/// Coverage inspection of existing period files
pub mod coverage;

/// Remote trade source client
pub mod fetcher;

/// Data output writers
pub mod output;

/// Time range partitioning utilities
pub mod timeline;

/// A single executed trade as reported by the exchange.
///
/// Wire format is a positional array `[ID, MTS, AMOUNT, PRICE]`. The sign of
/// `amount` encodes the side (negative = sell) and is preserved verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    /// Exchange-assigned trade ID
    pub id: i64,
    /// Execution time (Unix timestamp in milliseconds)
    pub mts: i64,
    /// Traded amount in the base currency; sign encodes the side
    pub amount: Decimal,
    /// Execution price
    pub price: Decimal,
}

impl Trade {
    /// Validate trade data integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.mts <= 0 {
            return Err(format!("Timestamp must be positive, got {}", self.mts));
        }

        if self.price <= Decimal::ZERO {
            return Err(format!("Price must be positive, got {}", self.price));
        }

        if self.amount == Decimal::ZERO {
            return Err("Amount cannot be zero".to_string());
        }

        Ok(())
    }
}
