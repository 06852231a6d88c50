//! End-to-end backfill tests against a scripted in-process trade source

use async_trait::async_trait;
use bitfinex_backfill::backfill::{backfill_range, run_period, Orchestrator};
use bitfinex_backfill::coverage::{inspect_period, missing_days};
use bitfinex_backfill::fetcher::{FetcherError, FetcherResult, TradeSource};
use bitfinex_backfill::output::path::period_file_path;
use bitfinex_backfill::output::{OutputResult, TradeWriter};
use bitfinex_backfill::timeline::{month_start, TimeRange};
use bitfinex_backfill::Trade;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A deterministic trade source: serves a fixed trade set, records every
/// page request, and can be scripted to fail for specific windows.
struct ScriptedSource {
    trades: Vec<Trade>,
    fail_windows: Vec<(i64, i64)>,
    calls: Mutex<Vec<(i64, i64)>>,
}

impl ScriptedSource {
    fn new(trades: Vec<Trade>) -> Self {
        Self {
            trades,
            fail_windows: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing_for(mut self, window: (i64, i64)) -> Self {
        self.fail_windows.push(window);
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TradeSource for ScriptedSource {
    async fn fetch_page(
        &self,
        start_ms: i64,
        end_ms: i64,
        limit: usize,
    ) -> FetcherResult<Vec<Trade>> {
        self.calls.lock().unwrap().push((start_ms, end_ms));

        if self
            .fail_windows
            .iter()
            .any(|&(s, e)| start_ms >= s && start_ms < e)
        {
            return Err(FetcherError::NetworkError("scripted failure".to_string()));
        }

        Ok(self
            .trades
            .iter()
            .filter(|t| t.mts >= start_ms && t.mts < end_ms)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// Trade sink backed by a plain Vec, for exercising the fetch loop alone.
#[derive(Default)]
struct VecWriter {
    trades: Vec<Trade>,
}

impl TradeWriter for VecWriter {
    fn write_trade(&mut self, trade: &Trade) -> OutputResult<()> {
        self.trades.push(trade.clone());
        Ok(())
    }

    fn flush(&mut self) -> OutputResult<()> {
        Ok(())
    }
}

fn trade(id: i64, mts: i64) -> Trade {
    Trade {
        id,
        mts,
        amount: Decimal::new(5, 1),
        price: Decimal::new(800025, 2),
    }
}

fn march_2020() -> TimeRange {
    TimeRange::new(month_start(2020, 3), month_start(2020, 4))
}

/// Two trades on every day of the period, one and two hours past midnight.
fn trades_covering(period: &TimeRange) -> Vec<Trade> {
    let mut trades = Vec::new();
    let mut id = 1;
    let mut day = period.start;
    while day < period.end {
        for hour in [1i64, 2] {
            let mts = day.timestamp_millis() + hour * 3_600_000;
            if mts < period.end_ms() {
                trades.push(trade(id, mts));
                id += 1;
            }
        }
        day += Duration::days(1);
    }
    trades
}

#[tokio::test]
async fn test_pagination_terminates_on_short_page() {
    let window = TimeRange::new(
        Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2020, 3, 2, 0, 0, 0).unwrap(),
    );

    // Seven trades, one minute apart; page size three -> pages of 3, 3, 1
    let trades: Vec<_> = (0..7)
        .map(|i| trade(i, window.start_ms() + i * 60_000))
        .collect();
    let source = ScriptedSource::new(trades);
    let mut writer = VecWriter::default();

    let outcome = backfill_range(&source, &mut writer, "2020-03", &window, 3).await;

    assert!(!outcome.aborted);
    assert_eq!(outcome.trades_written, 7);
    assert_eq!(source.call_count(), 3);
    assert_eq!(writer.trades.len(), 7);
    assert_eq!(outcome.first_ts, Some(window.start_ms()));
    assert_eq!(outcome.last_ts, Some(window.start_ms() + 6 * 60_000));

    // Ascending order is preserved in the sink
    for pair in writer.trades.windows(2) {
        assert!(pair[0].mts < pair[1].mts);
    }
}

#[tokio::test]
async fn test_pagination_terminates_on_empty_page() {
    let window = march_2020();
    let source = ScriptedSource::new(Vec::new());
    let mut writer = VecWriter::default();

    let outcome = backfill_range(&source, &mut writer, "2020-03", &window, 3).await;

    assert_eq!(outcome, Default::default());
    assert_eq!(source.call_count(), 1);
}

#[tokio::test]
async fn test_full_month_backfill_then_idempotent_rerun() {
    let dir = TempDir::new().unwrap();
    let period = march_2020();
    let trades = trades_covering(&period);
    let expected = trades.len() as u64;

    let source = ScriptedSource::new(trades.clone());
    let result = run_period(&source, "tBTCUSD", dir.path(), &period).await;

    assert_eq!(result.period_label, "2020-03");
    assert_eq!(result.trades_written, expected);
    assert_eq!(result.error_count, 0);
    assert_eq!(result.first_ts, Some(trades.first().unwrap().mts));
    assert_eq!(result.last_ts, Some(trades.last().unwrap().mts));
    // One short-page request per day of March
    assert_eq!(source.call_count(), 31);

    let report = inspect_period(&result.path, &period);
    assert_eq!(report.records, expected);
    assert!(missing_days(&report, &period).is_empty());

    // Second run: every day is covered, so no fetches and no writes
    let rerun_source = ScriptedSource::new(trades);
    let rerun = run_period(&rerun_source, "tBTCUSD", dir.path(), &period).await;

    assert_eq!(rerun.trades_written, 0);
    assert_eq!(rerun.error_count, 0);
    assert_eq!(rerun_source.call_count(), 0);

    let report = inspect_period(&rerun.path, &period);
    assert_eq!(report.records, expected, "rerun must not duplicate rows");
}

#[tokio::test]
async fn test_partially_covered_month_fetches_only_the_gaps() {
    let dir = TempDir::new().unwrap();
    let period = march_2020();
    let path = period_file_path(dir.path(), "tBTCUSD", &period);

    // Seed the file with trades on March 1st and 3rd only
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        "id,mts,datetime,amount,price\n\
         900,1583024400000,2020-03-01T01:00:00+00:00,0.5,8000\n\
         901,1583197200000,2020-03-03T01:00:00+00:00,0.5,8000\n",
    )
    .unwrap();

    let source = ScriptedSource::new(trades_covering(&period));
    let result = run_period(&source, "tBTCUSD", dir.path(), &period).await;

    // 29 missing days, one request each
    assert_eq!(source.call_count(), 29);
    assert_eq!(result.trades_written, 29 * 2);
    assert_eq!(result.error_count, 0);

    let report = inspect_period(&path, &period);
    assert!(missing_days(&report, &period).is_empty());
}

#[tokio::test]
async fn test_zero_trade_day_stays_missing_without_error() {
    let dir = TempDir::new().unwrap();
    let period = march_2020();

    let source = ScriptedSource::new(Vec::new());
    let result = run_period(&source, "tBTCUSD", dir.path(), &period).await;

    assert_eq!(result.trades_written, 0);
    assert_eq!(result.error_count, 0);

    // The file exists (header only) but no day became covered
    let report = inspect_period(&result.path, &period);
    assert!(report.is_empty());
    assert_eq!(missing_days(&report, &period).len(), 31);
}

#[tokio::test]
async fn test_failing_day_is_isolated_from_the_rest_of_the_month() {
    let dir = TempDir::new().unwrap();
    let period = march_2020();

    let bad_day_start = Utc
        .with_ymd_and_hms(2020, 3, 2, 0, 0, 0)
        .unwrap()
        .timestamp_millis();
    let bad_day_end = Utc
        .with_ymd_and_hms(2020, 3, 3, 0, 0, 0)
        .unwrap()
        .timestamp_millis();

    let source =
        ScriptedSource::new(trades_covering(&period)).failing_for((bad_day_start, bad_day_end));
    let result = run_period(&source, "tBTCUSD", dir.path(), &period).await;

    assert_eq!(result.error_count, 1);
    assert_eq!(result.trades_written, 30 * 2);

    // Only the failed day is still missing; a re-run would pick it up
    let report = inspect_period(&result.path, &period);
    let still_missing = missing_days(&report, &period);
    assert_eq!(still_missing.len(), 1);
    assert_eq!(still_missing[0].timestamp_millis(), bad_day_start);
}

#[tokio::test]
async fn test_orchestrator_aggregates_sorted_per_period_results() {
    let dir = TempDir::new().unwrap();
    let span = TimeRange::new(
        Utc.with_ymd_and_hms(2020, 1, 15, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2020, 3, 10, 0, 0, 0).unwrap(),
    );

    let source = Arc::new(ScriptedSource::new(trades_covering(&span)));
    let orchestrator =
        Orchestrator::new(source.clone(), "tBTCUSD", dir.path().to_path_buf(), 2);

    let summary = orchestrator.run(&span).await;

    let labels: Vec<_> = summary
        .results
        .iter()
        .map(|r| r.period_label.clone())
        .collect();
    assert_eq!(labels, vec!["2020-01", "2020-02", "2020-03"]);

    let per_period_total: u64 = summary.results.iter().map(|r| r.trades_written).sum();
    assert_eq!(summary.total_trades, per_period_total);
    // 17 days of January + 29 of February + 9 of March, two trades each
    assert_eq!(summary.total_trades, (17 + 29 + 9) * 2);
    assert_eq!(summary.total_errors, 0);

    // Each period landed in its own file
    for result in &summary.results {
        assert!(result.path.exists(), "missing {}", result.path.display());
    }
}
