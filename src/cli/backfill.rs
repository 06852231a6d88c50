//! Backfill command implementation

use crate::backfill::config::{DEFAULT_WORKERS, MAX_RETRIES};
use crate::backfill::{Orchestrator, RatePacer, RunSummary};
use crate::fetcher::BitfinexClient;
use crate::timeline::TimeRange;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::{CliError, CoverageArgs};

/// Maximum allowed worker pool size to prevent self-inflicted rate limiting
const MAX_WORKERS: usize = 32;

/// Bitfinex historical trades backfiller
#[derive(Parser, Debug)]
#[command(name = "bitfinex-backfill")]
#[command(about = "Backfill historical Bitfinex trades into monthly CSV files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Bitfinex trading symbol (e.g., tBTCUSD)
    #[arg(long, global = true, default_value = "tBTCUSD")]
    pub symbol: String,

    /// Root output directory for monthly CSV files
    #[arg(long, global = true, default_value = "bitfinex_data")]
    pub data_dir: PathBuf,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Backfill missing days, fetching from the exchange
    Backfill(BackfillArgs),

    /// Report coverage of existing monthly files without fetching
    Coverage(CoverageArgs),
}

/// Backfill command arguments
#[derive(Parser, Debug)]
pub struct BackfillArgs {
    /// Start of the span (YYYY-MM-DD, midnight UTC, or RFC 3339)
    #[arg(long)]
    pub start_date: String,

    /// Exclusive end of the span (YYYY-MM-DD or RFC 3339; default: now)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Number of concurrent period workers (default: 8, max: 32)
    ///
    /// One worker handles one calendar month. All workers share a single
    /// rate pacer, so more workers never exceed the request ceiling.
    #[arg(long, default_value_t = DEFAULT_WORKERS, value_parser = parse_workers)]
    pub workers: usize,

    /// Maximum number of retries for failed requests (default: 5, range: 1-20)
    #[arg(long, default_value_t = MAX_RETRIES, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,
}

/// Parse and validate the worker pool size
fn parse_workers(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("workers must be at least 1".to_string());
    }
    if value > MAX_WORKERS {
        return Err(format!("workers {value} exceeds maximum of {MAX_WORKERS}"));
    }
    Ok(value)
}

/// Try to parse a datetime from RFC 3339 format.
///
/// Accepts inputs with and without a timezone designator; naive inputs are
/// taken as UTC.
fn try_parse_datetime_rfc3339(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}

/// Parse a span boundary from YYYY-MM-DD or RFC 3339 format.
///
/// Date-only input maps to midnight UTC of that date. The span is
/// half-open, so an end date of `2016-02-10` excludes that day.
pub(crate) fn parse_datetime_flexible(input: &str) -> Result<DateTime<Utc>, CliError> {
    if let Some(dt) = try_parse_datetime_rfc3339(input) {
        return Ok(dt);
    }

    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid date '{input}': {e}")))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidArgument(format!("Invalid date '{input}'")))?;
    Ok(datetime.and_utc())
}

/// Resolve a global span from start/end arguments.
pub(crate) fn parse_span(start: &str, end: Option<&str>) -> Result<TimeRange, CliError> {
    let start = parse_datetime_flexible(start)?;
    let end = match end {
        Some(end) => parse_datetime_flexible(end)?,
        None => Utc::now(),
    };

    if start >= end {
        return Err(CliError::InvalidArgument(format!(
            "start ({start}) must be before end ({end})"
        )));
    }

    Ok(TimeRange::new(start, end))
}

impl BackfillArgs {
    /// Execute the backfill command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let span = parse_span(&self.start_date, self.end_date.as_deref())?;

        std::fs::create_dir_all(&cli.data_dir).map_err(|e| {
            CliError::InvalidArgument(format!(
                "Cannot create output directory {}: {e}",
                cli.data_dir.display()
            ))
        })?;

        let pacer = Arc::new(RatePacer::with_defaults());

        println!("Bitfinex Historical Trades Backfiller");
        println!("=====================================");
        println!("Symbol      : {}", cli.symbol);
        println!("Span        : {span}");
        println!("Output dir  : {}", cli.data_dir.display());
        println!("Workers     : {}", self.workers);
        println!(
            "Rate limit  : ~1 request every {:.2}s\n",
            pacer.interval().as_secs_f64()
        );

        info!(
            "Planned periods: {}",
            span.month_ranges()
                .iter()
                .map(|p| p.month_label())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let client =
            BitfinexClient::new(cli.symbol.as_str(), pacer)?.with_max_retries(self.max_retries);

        let orchestrator = Orchestrator::new(
            Arc::new(client),
            cli.symbol.as_str(),
            cli.data_dir.clone(),
            self.workers,
        );

        let summary = orchestrator.run(&span).await;
        print_summary(&summary);

        Ok(())
    }
}

/// Print the per-period and aggregate summary.
fn print_summary(summary: &RunSummary) {
    println!("\nSummary:");
    println!("========");
    for result in &summary.results {
        println!(
            "{}: trades_written={}, file={}, errors={}",
            result.period_label,
            result.trades_written,
            result.path.display(),
            result.error_count
        );
    }
    println!("\nTotal trades written this run: {}", summary.total_trades);
    if summary.total_errors > 0 {
        println!(
            "Abandoned day windows: {} (re-run to pick up the gaps)",
            summary.total_errors
        );
    }
}
