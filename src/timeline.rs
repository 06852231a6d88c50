//! Half-open UTC time ranges and calendar partitioning.
//!
//! A [`TimeRange`] covers `[start, end)`. The global backfill span is split
//! into calendar-month-aligned ranges that tile it exactly: no gaps, no
//! overlaps, first and last ranges clipped to the span boundaries.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// A half-open time range `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// Inclusive start instant
    pub start: DateTime<Utc>,
    /// Exclusive end instant
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a new range. Callers are expected to uphold `start < end`;
    /// partitioning only ever emits non-empty ranges.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Start instant as milliseconds since the Unix epoch.
    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    /// End instant as milliseconds since the Unix epoch.
    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }

    /// Whether the range contains no time at all.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// `YYYY-MM` label of the month this range starts in.
    pub fn month_label(&self) -> String {
        format!("{:04}-{:02}", self.start.year(), self.start.month())
    }

    /// Split this range into calendar-month-aligned sub-ranges.
    ///
    /// The sub-ranges tile `[start, end)` exactly: the first is clipped to
    /// `start`, the last to `end`, interior ranges run first-of-month to
    /// first-of-next-month, and empty ranges are not emitted.
    pub fn month_ranges(&self) -> Vec<TimeRange> {
        let mut ranges = Vec::new();
        let mut cur = month_start(self.start.year(), self.start.month());

        while cur < self.end {
            let nxt = if cur.month() == 12 {
                month_start(cur.year() + 1, 1)
            } else {
                month_start(cur.year(), cur.month() + 1)
            };

            let range = TimeRange::new(cur.max(self.start), nxt.min(self.end));
            if !range.is_empty() {
                ranges.push(range);
            }
            cur = nxt;
        }

        ranges
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} .. {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Midnight UTC on the first day of the given month.
pub fn month_start(year: i32, month: u32) -> DateTime<Utc> {
    // SAFETY: month is always 1-12 at call sites, day 1 is always valid.
    let date = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month 1-12, day 1");
    let datetime = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    datetime.and_utc()
}

/// Midnight UTC at the start of the given calendar date.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    let datetime = date.and_hms_opt(0, 0, 0).expect("midnight is always valid");
    datetime.and_utc()
}

/// Render a millisecond timestamp as an RFC 3339 string (UTC).
///
/// Timestamps outside the representable range render as `invalid(<ms>)`
/// rather than failing; they only ever come from already-persisted rows.
pub fn ms_to_rfc3339(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.to_rfc3339(),
        None => format!("invalid({ms})"),
    }
}
