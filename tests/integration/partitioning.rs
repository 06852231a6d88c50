//! Integration tests for calendar-month partitioning

use bitfinex_backfill::timeline::{month_start, TimeRange};
use chrono::{Datelike, TimeZone, Utc};

#[test]
fn test_partitioning_example_across_year_boundary() {
    let span = TimeRange::new(
        Utc.with_ymd_and_hms(2015, 11, 15, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2016, 2, 10, 0, 0, 0).unwrap(),
    );

    let ranges = span.month_ranges();
    assert_eq!(ranges.len(), 3);
    assert_eq!(ranges[0].start, span.start);
    assert_eq!(ranges[0].end, month_start(2015, 12));
    assert_eq!(ranges[1].start, month_start(2015, 12));
    assert_eq!(ranges[1].end, month_start(2016, 1));
    assert_eq!(ranges[2].start, month_start(2016, 1));
    assert_eq!(ranges[2].end, span.end);
}

#[test]
fn test_partitioning_tiles_without_gaps_or_overlaps() {
    let spans = [
        (
            Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2015, 1, 2, 0, 0, 0).unwrap(),
        ),
        (
            Utc.with_ymd_and_hms(2018, 6, 30, 23, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2018, 7, 1, 0, 0, 1).unwrap(),
        ),
        (
            Utc.with_ymd_and_hms(2012, 2, 29, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2016, 3, 1, 0, 0, 0).unwrap(),
        ),
    ];

    for (start, end) in spans {
        let span = TimeRange::new(start, end);
        let ranges = span.month_ranges();

        assert!(!ranges.is_empty());
        assert_eq!(ranges.first().unwrap().start, start);
        assert_eq!(ranges.last().unwrap().end, end);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start, "gap or overlap in {span}");
        }
        for range in &ranges {
            assert!(range.start < range.end, "empty range emitted for {span}");
        }
    }
}

#[test]
fn test_partitioning_interior_ranges_are_month_aligned() {
    let span = TimeRange::new(
        Utc.with_ymd_and_hms(2019, 10, 20, 8, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2020, 2, 5, 0, 0, 0).unwrap(),
    );

    let ranges = span.month_ranges();
    assert_eq!(ranges.len(), 5);

    // Every boundary except the global ones is a first-of-month midnight
    for range in &ranges[1..] {
        assert_eq!(range.start.time(), chrono::NaiveTime::MIN);
        assert_eq!(range.start.date_naive().day0(), 0);
    }

    let labels: Vec<_> = ranges.iter().map(|r| r.month_label()).collect();
    assert_eq!(
        labels,
        vec!["2019-10", "2019-11", "2019-12", "2020-01", "2020-02"]
    );
}
