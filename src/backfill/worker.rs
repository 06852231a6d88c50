//! One calendar month, end-to-end.
//!
//! A period worker inspects the month's file, computes which calendar days
//! are missing, and backfills each missing day in ascending order through
//! the shared pacer. It never returns an error: every failure is folded
//! into the [`WorkerResult`] so one bad month cannot take down the run.

use crate::backfill::config::MAX_PAGE_LIMIT;
use crate::backfill::{backfill_range, WorkerResult};
use crate::coverage::{inspect_period, missing_days};
use crate::fetcher::TradeSource;
use crate::output::path::period_file_path;
use crate::output::{CsvTradeWriter, TradeWriter};
use crate::timeline::{ms_to_rfc3339, TimeRange};
use chrono::Duration;
use std::path::Path;
use tracing::{error, info, warn};

/// Backfill one period, appending missing days to its file.
pub async fn run_period<S>(
    source: &S,
    symbol: &str,
    data_dir: &Path,
    period: &TimeRange,
) -> WorkerResult
where
    S: TradeSource + ?Sized,
{
    let label = period.month_label();
    let path = period_file_path(data_dir, symbol, period);

    let mut result = WorkerResult {
        period_label: label.clone(),
        trades_written: 0,
        first_ts: None,
        last_ts: None,
        path: path.clone(),
        error_count: 0,
    };

    let report = inspect_period(&path, period);
    if report.is_empty() {
        if path.exists() {
            info!("[{label}] Existing file but no trades for this period (header only).");
        } else {
            info!("[{label}] No existing file; full period backfill needed.");
        }
    } else {
        info!(
            "[{label}] Existing file: trades={}, earliest={} latest={}",
            report.records,
            report.min_ts.map(ms_to_rfc3339).unwrap_or_default(),
            report.max_ts.map(ms_to_rfc3339).unwrap_or_default(),
        );
    }

    let missing = missing_days(&report, period);
    if missing.is_empty() {
        info!("[{label}] No missing days; nothing to do.");
        return result;
    }

    info!(
        "[{label}] Missing {} day(s) in {} -> {}.",
        missing.len(),
        period.start.date_naive(),
        period.end.date_naive()
    );

    let mut writer = match CsvTradeWriter::append(&path) {
        Ok(writer) => writer,
        Err(e) => {
            error!("[{label}] Cannot open {}: {e}", path.display());
            result.error_count += 1;
            return result;
        }
    };

    // Missing days arrive sorted ascending; keep that order so the file
    // stays inspectable on the next run.
    for day in missing {
        let window = TimeRange::new(
            day.max(period.start),
            (day + Duration::days(1)).min(period.end),
        );
        info!("[{label}] Backfilling day {} ({window})", day.date_naive());

        let outcome = backfill_range(source, &mut writer, &label, &window, MAX_PAGE_LIMIT).await;

        if outcome.aborted {
            result.error_count += 1;
        }

        if outcome.trades_written > 0 {
            result.trades_written += outcome.trades_written;
            result.first_ts = match (result.first_ts, outcome.first_ts) {
                (Some(cur), Some(new)) => Some(cur.min(new)),
                (cur, new) => cur.or(new),
            };
            result.last_ts = match (result.last_ts, outcome.last_ts) {
                (Some(cur), Some(new)) => Some(cur.max(new)),
                (cur, new) => cur.or(new),
            };
        }
    }

    if let Err(e) = writer.flush() {
        warn!("[{label}] Final flush failed: {e}");
        result.error_count += 1;
    } else if let Err(e) = writer.close() {
        warn!("[{label}] Close failed: {e}");
        result.error_count += 1;
    }

    info!(
        "[{label}] Done. Trades written this run: {}, errors: {}",
        result.trades_written, result.error_count
    );

    result
}
