//! Paginated fetching of one time window.
//!
//! Turns a half-open window into a bounded sequence of API calls: fetch a
//! page starting at the cursor, append it to the sink, advance the cursor
//! past the last returned timestamp, repeat. Failures stop the loop early
//! and are reported through the outcome; they never propagate past the
//! period worker.

use crate::fetcher::TradeSource;
use crate::output::TradeWriter;
use crate::timeline::{ms_to_rfc3339, TimeRange};
use tracing::{debug, info, warn};

/// What one range backfill accomplished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeOutcome {
    /// Trades appended to the sink
    pub trades_written: u64,
    /// Timestamp of the first trade written, if any
    pub first_ts: Option<i64>,
    /// Timestamp of the last trade written, if any
    pub last_ts: Option<i64>,
    /// Whether the loop stopped early on an unrecoverable failure
    pub aborted: bool,
}

/// Backfill trades for `window`, appending to `writer`.
///
/// Pages are requested ascending with `limit = page_limit`; the loop
/// terminates when a page comes back empty, shorter than `page_limit`
/// (likely exhausted), or the cursor passes the end of the window. On a
/// fetch or write failure the outcome carries whatever was written so far
/// with `aborted` set.
pub async fn backfill_range<S, W>(
    source: &S,
    writer: &mut W,
    label: &str,
    window: &TimeRange,
    page_limit: usize,
) -> RangeOutcome
where
    S: TradeSource + ?Sized,
    W: TradeWriter,
{
    let mut cursor = window.start_ms();
    let end_ms = window.end_ms();
    let mut outcome = RangeOutcome::default();

    while cursor < end_ms {
        let page = match source.fetch_page(cursor, end_ms, page_limit).await {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    "[{label}] Abandoning window {} -> {}: {e}",
                    ms_to_rfc3339(cursor),
                    ms_to_rfc3339(end_ms)
                );
                outcome.aborted = true;
                return outcome;
            }
        };

        if page.is_empty() {
            // No more trades in this window
            break;
        }

        let page_len = page.len();
        // Pages arrive sorted ascending; last entry drives the cursor
        let batch_first = page[0].mts;
        let batch_last = page[page_len - 1].mts;

        for trade in &page {
            if let Err(e) = writer.write_trade(trade) {
                warn!(
                    "[{label}] Abandoning window {} -> {}: sink error: {e}",
                    ms_to_rfc3339(cursor),
                    ms_to_rfc3339(end_ms)
                );
                outcome.aborted = true;
                return outcome;
            }
            outcome.trades_written += 1;
        }

        outcome.first_ts.get_or_insert(batch_first);
        outcome.last_ts = Some(batch_last);
        cursor = batch_last + 1;

        debug!(
            "[{label}]   +{page_len} trades ({} -> {}), range_total={}",
            ms_to_rfc3339(batch_first),
            ms_to_rfc3339(batch_last),
            outcome.trades_written
        );

        // A short page means the window is likely exhausted
        if page_len < page_limit {
            break;
        }
    }

    if outcome.trades_written == 0 && !outcome.aborted {
        info!("[{label}]   No trades returned for {window}");
    }

    outcome
}
