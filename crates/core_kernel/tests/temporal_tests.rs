//! Tests for reporting periods

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use core_kernel::{ReportingPeriod, TemporalError};

fn march(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

#[test]
fn test_bounded_period_contains_start_but_not_end() {
    let period = ReportingPeriod::bounded(march(1, 0), march(2, 0)).unwrap();

    assert!(period.contains(march(1, 0)));
    assert!(period.contains(march(1, 23)));
    assert!(!period.contains(march(2, 0)));
}

#[test]
fn test_unbounded_period() {
    let period = ReportingPeriod::starting_at(march(1, 0));

    assert!(period.is_unbounded());
    assert!(period.contains(march(31, 23)));
    assert_eq!(period.duration(), None);
}

#[test]
fn test_invalid_period_error_carries_bounds() {
    let error = ReportingPeriod::bounded(march(2, 0), march(1, 0)).unwrap_err();

    match error {
        TemporalError::InvalidPeriod { start, end } => {
            assert!(start.contains("2024-03-02"));
            assert!(end.contains("2024-03-01"));
        }
        other => panic!("Expected InvalidPeriod, got {:?}", other),
    }
}

#[test]
fn test_interval_ending_before_period_does_not_overlap() {
    let period = ReportingPeriod::bounded(march(10, 0), march(11, 0)).unwrap();

    assert!(!period.overlaps_interval(march(9, 8), Some(march(9, 18))));
    assert!(!period.overlaps_interval(march(11, 0), None));
}

#[test]
fn test_interval_spanning_period_overlaps() {
    let period = ReportingPeriod::bounded(march(10, 0), march(11, 0)).unwrap();

    assert!(period.overlaps_interval(march(9, 8), Some(march(12, 8))));
    assert!(period.overlaps_interval(march(9, 8), None));
    assert!(period.overlaps_interval(march(10, 23), Some(march(11, 2))));
}

#[test]
fn test_days_period() {
    let first = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let last = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
    let period = ReportingPeriod::days(first, last).unwrap();

    assert_eq!(period.start, march(1, 0));
    assert_eq!(period.end, Some(march(8, 0)));
    assert_eq!(period.duration(), Some(Duration::days(7)));
}

#[test]
fn test_trailing_period() {
    let now = march(15, 12);
    let period = ReportingPeriod::trailing(now, Duration::hours(24)).unwrap();

    assert_eq!(period.start, march(14, 12));
    assert!(!period.contains(now));
}
