//! Coverage inspection of existing period files.
//!
//! The monthly CSV files are the only source of truth for what has already
//! been downloaded: every run re-derives coverage by scanning them, so no
//! side metadata can drift out of sync with the data.

use crate::timeline::{day_start, TimeRange};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

/// What a period file already contains, derived by scanning it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageReport {
    /// Calendar dates (UTC) with at least one trade inside the period
    pub present_dates: BTreeSet<NaiveDate>,
    /// Earliest trade timestamp within the period, if any
    pub min_ts: Option<i64>,
    /// Latest trade timestamp within the period, if any
    pub max_ts: Option<i64>,
    /// Number of in-period trades in the file
    pub records: u64,
}

impl CoverageReport {
    /// Whether the file contained no usable in-period trades.
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

/// Inspect an existing period CSV and report which days it covers.
///
/// Rows that cannot be parsed are skipped. Rows whose timestamp falls
/// outside `period` are skipped as well: they neither count as present nor
/// contribute to min/max. A missing or unreadable file yields an empty
/// report, which is the "fully missing period" signal, not an error.
pub fn inspect_period(path: &Path, period: &TimeRange) -> CoverageReport {
    let mut report = CoverageReport::default();

    if !path.exists() {
        return report;
    }

    let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            warn!("Could not open {} for inspection: {}", path.display(), e);
            return report;
        }
    };

    let start_ms = period.start_ms();
    let end_ms = period.end_ms();

    for row in reader.records() {
        let Ok(row) = row else { continue };
        let Some(mts) = row.get(1).and_then(|field| field.trim().parse::<i64>().ok()) else {
            continue;
        };

        // Ignore trades that somehow fall outside this period
        if mts < start_ms || mts >= end_ms {
            continue;
        }

        let Some(dt) = Utc.timestamp_millis_opt(mts).single() else {
            continue;
        };

        report.records += 1;
        report.min_ts = Some(report.min_ts.map_or(mts, |cur| cur.min(mts)));
        report.max_ts = Some(report.max_ts.map_or(mts, |cur| cur.max(mts)));
        report.present_dates.insert(dt.date_naive());
    }

    debug!(
        "Inspected {}: {} trades across {} day(s)",
        path.display(),
        report.records,
        report.present_dates.len()
    );

    report
}

/// Compute which calendar days (UTC) in `[period.start.date, period.end.date)`
/// have no trades in the report.
///
/// Returned as the UTC midnight start of each missing day, in ascending
/// order. A day counts as present after a single trade; partial days are
/// not detected.
pub fn missing_days(report: &CoverageReport, period: &TimeRange) -> Vec<DateTime<Utc>> {
    let mut missing = Vec::new();
    let mut cur = period.start.date_naive();
    let end = period.end.date_naive();

    while cur < end {
        if !report.present_dates.contains(&cur) {
            missing.push(day_start(cur));
        }
        cur += Duration::days(1);
    }

    missing
}
