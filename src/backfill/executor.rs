//! Bounded-pool orchestration across calendar months.
//!
//! The global span is split into calendar months and one period worker is
//! submitted per month to a bounded concurrent pool. Workers complete in
//! arbitrary order; the summary is sorted by period label afterwards so
//! output is deterministic. Each worker owns its period file, so a failing
//! month never cancels or corrupts another.

use crate::backfill::{run_period, WorkerResult};
use crate::fetcher::TradeSource;
use crate::timeline::TimeRange;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Aggregated outcome of one orchestrator run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Per-period results, sorted by period label
    pub results: Vec<WorkerResult>,
    /// Total trades appended across all periods
    pub total_trades: u64,
    /// Total abandoned day windows across all periods
    pub total_errors: u64,
}

/// Fans one period worker per calendar month out across a bounded pool.
pub struct Orchestrator {
    source: Arc<dyn TradeSource>,
    symbol: String,
    data_dir: PathBuf,
    workers: usize,
}

impl Orchestrator {
    /// Create an orchestrator.
    ///
    /// # Arguments
    /// * `source` - Shared trade source (all workers pace through it)
    /// * `symbol` - Trading symbol used for period file naming
    /// * `data_dir` - Root output directory
    /// * `workers` - Concurrent period workers (clamped to at least 1)
    pub fn new(
        source: Arc<dyn TradeSource>,
        symbol: impl Into<String>,
        data_dir: PathBuf,
        workers: usize,
    ) -> Self {
        Self {
            source,
            symbol: symbol.into(),
            data_dir,
            workers: workers.max(1),
        }
    }

    /// Backfill every calendar month of `span`, returning the sorted summary.
    pub async fn run(&self, span: &TimeRange) -> RunSummary {
        let periods = span.month_ranges();

        info!(
            "Backfilling {} period(s) for {} with {} worker(s)",
            periods.len(),
            self.symbol,
            self.workers
        );

        let progress = create_progress_bar(periods.len() as u64, &self.symbol);

        let mut results: Vec<WorkerResult> = stream::iter(periods)
            .map(|period| {
                let source = Arc::clone(&self.source);
                let symbol = self.symbol.clone();
                let data_dir = self.data_dir.clone();
                let progress = progress.clone();

                async move {
                    let result = run_period(source.as_ref(), &symbol, &data_dir, &period).await;
                    progress.inc(1);
                    result
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        progress.finish_and_clear();

        // Completion order is non-deterministic; sort for a stable summary
        results.sort_by(|a, b| a.period_label.cmp(&b.period_label));

        let total_trades = results.iter().map(|r| r.trades_written).sum();
        let total_errors = results.iter().map(|r| u64::from(r.error_count)).sum();

        RunSummary {
            results,
            total_trades,
            total_errors,
        }
    }
}

fn create_progress_bar(periods: u64, symbol: &str) -> ProgressBar {
    let pb = ProgressBar::new(periods);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} periods {msg}")
            .expect("hardcoded template is valid")
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Backfilling {symbol}"));
    pb
}
