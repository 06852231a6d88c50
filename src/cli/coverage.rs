//! Coverage command implementation.
//!
//! Read-only: reports what the existing monthly files already contain for a
//! span, without touching the network. Useful before and after a backfill
//! run, since the files themselves are the only record of progress.

use crate::coverage::{inspect_period, missing_days};
use crate::output::path::period_file_path;
use crate::timeline::ms_to_rfc3339;
use clap::Parser;

use super::backfill::parse_span;
use super::{Cli, CliError};

/// Coverage command arguments
#[derive(Parser, Debug)]
pub struct CoverageArgs {
    /// Start of the span (YYYY-MM-DD, midnight UTC, or RFC 3339)
    #[arg(long)]
    pub start_date: String,

    /// Exclusive end of the span (YYYY-MM-DD or RFC 3339; default: now)
    #[arg(long)]
    pub end_date: Option<String>,
}

impl CoverageArgs {
    /// Execute the coverage command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let span = parse_span(&self.start_date, self.end_date.as_deref())?;

        println!("Coverage for {} in {span}", cli.symbol);
        println!("=========");

        let mut total_records = 0u64;
        let mut total_missing = 0usize;

        for period in span.month_ranges() {
            let path = period_file_path(&cli.data_dir, &cli.symbol, &period);
            let report = inspect_period(&path, &period);
            let missing = missing_days(&report, &period);

            let range = match (report.min_ts, report.max_ts) {
                (Some(min), Some(max)) => {
                    format!(", {} -> {}", ms_to_rfc3339(min), ms_to_rfc3339(max))
                }
                _ => String::new(),
            };

            println!(
                "{}: trades={}, days_present={}, days_missing={}{range}",
                period.month_label(),
                report.records,
                report.present_dates.len(),
                missing.len(),
            );

            total_records += report.records;
            total_missing += missing.len();
        }

        println!("\nTotal trades on disk: {total_records}");
        println!("Total missing days  : {total_missing}");

        Ok(())
    }
}
