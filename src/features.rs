//! Feature derivation
//!
//! This module resolves a raw night into timing features on a single UTC
//! epoch-minute scale:
//! - Sleep onset and wake time (floored to whole minutes)
//! - Sleep duration, clamped to be non-negative
//! - Midsleep point

use crate::error::DriftError;
use crate::types::{DerivedNight, RawNight};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Ordering;

pub const MINUTES_PER_DAY: i64 = 1440;

/// Canonical format of the night date key
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Feature deriver for computing derived nights
pub struct FeatureDeriver;

impl FeatureDeriver {
    /// Derive timing features from a raw night
    pub fn derive(raw: &RawNight) -> Result<DerivedNight, DriftError> {
        let night_date = parse_night_date(&raw.date).ok_or_else(|| DriftError::InvalidDate {
            context: "date".to_string(),
            value: raw.date.clone(),
        })?;
        let start_min_epoch = parse_epoch_minutes(&raw.sleep_start)
            .ok_or_else(|| invalid_timestamp(raw, "sleep_start", &raw.sleep_start))?;
        let end_min_epoch = parse_epoch_minutes(&raw.sleep_end)
            .ok_or_else(|| invalid_timestamp(raw, "sleep_end", &raw.sleep_end))?;

        let duration_min = compute_duration(start_min_epoch, end_min_epoch);
        let midsleep_min_epoch = compute_midsleep(start_min_epoch, duration_min);

        Ok(DerivedNight {
            raw: raw.clone(),
            night_date,
            start_min_epoch,
            end_min_epoch,
            duration_min,
            midsleep_min_epoch,
            midsleep_clock_min: clock_minutes(midsleep_min_epoch),
        })
    }

    /// Derive every night, failing on the first unparseable timestamp
    pub fn derive_all(raws: &[RawNight]) -> Result<Vec<DerivedNight>, DriftError> {
        raws.iter().map(Self::derive).collect()
    }

    /// Validate a raw night and rewrite its date key in canonical form, so
    /// `2024-1-5` and `2024-01-05` land on the same store entry.
    pub fn canonicalize(raw: RawNight) -> Result<RawNight, DriftError> {
        let derived = Self::derive(&raw)?;
        Ok(RawNight {
            date: derived.night_date.format(DATE_FORMAT).to_string(),
            ..raw
        })
    }

    /// Sort derived nights most-recent-first.
    ///
    /// Nights are ordered by parsed date, newest first; equal dates fall back
    /// to the later sleep onset.
    pub fn order_by_recency(nights: &mut [DerivedNight]) {
        nights.sort_by(|a, b| match b.night_date.cmp(&a.night_date) {
            Ordering::Equal => b.start_min_epoch.cmp(&a.start_min_epoch),
            other => other,
        });
    }
}

/// Parse an ISO-8601 timestamp to UTC.
///
/// Offset-bearing RFC 3339 values are converted to UTC; offset-less values are
/// taken to already be UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    value
        .parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a night date key (`YYYY-MM-DD`, padding optional)
pub fn parse_night_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Parse a timestamp and floor it to whole minutes since the Unix epoch
pub fn parse_epoch_minutes(value: &str) -> Option<i64> {
    parse_timestamp(value).map(|dt| dt.timestamp().div_euclid(60))
}

/// Duration between onset and wake; a wake time at or before onset yields 0
fn compute_duration(start_min: i64, end_min: i64) -> i64 {
    (end_min - start_min).max(0)
}

fn compute_midsleep(start_min: i64, duration_min: i64) -> i64 {
    start_min + duration_min.div_euclid(2)
}

/// Project epoch minutes onto a night-anchored UTC clock.
///
/// Times after noon map to negative minutes before midnight, so a night's
/// midsleep at 23:30 and the next at 00:30 sit 60 minutes apart.
pub fn clock_minutes(epoch_min: i64) -> i64 {
    let minute_of_day = epoch_min.rem_euclid(MINUTES_PER_DAY);
    if minute_of_day > MINUTES_PER_DAY / 2 {
        minute_of_day - MINUTES_PER_DAY
    } else {
        minute_of_day
    }
}

/// Shift clock minutes by whole days into `(reference - 720, reference + 720]`.
///
/// Clock values wrap once a day, so two nights either side of the wrap point
/// are compared through the nearest copy rather than across the seam.
pub fn unwrap_clock(value: i64, reference: i64) -> i64 {
    let offset = (value - reference).rem_euclid(MINUTES_PER_DAY);
    if offset > MINUTES_PER_DAY / 2 {
        reference + offset - MINUTES_PER_DAY
    } else {
        reference + offset
    }
}

fn invalid_timestamp(raw: &RawNight, field: &str, value: &str) -> DriftError {
    DriftError::InvalidTimestamp {
        context: format!("{} of night {}", field, raw.date),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn night(date: &str, start: &str, end: &str) -> RawNight {
        RawNight::new(date, start, end)
    }

    #[test]
    fn test_duration_and_midsleep() {
        let raw = night(
            "2024-01-01",
            "2024-01-01T01:00:00.000Z",
            "2024-01-01T08:30:00.000Z",
        );
        let derived = FeatureDeriver::derive(&raw).unwrap();

        assert_eq!(derived.duration_min, 450);
        assert_eq!(derived.midsleep_min_epoch, derived.start_min_epoch + 225);
        assert_eq!(derived.end_min_epoch - derived.start_min_epoch, 450);
    }

    #[test]
    fn test_odd_duration_floors_midpoint() {
        let raw = night(
            "2024-01-01",
            "2024-01-01T00:00:00Z",
            "2024-01-01T07:01:00Z",
        );
        let derived = FeatureDeriver::derive(&raw).unwrap();

        assert_eq!(derived.duration_min, 421);
        assert_eq!(derived.midsleep_min_epoch - derived.start_min_epoch, 210);
    }

    #[test]
    fn test_crosses_midnight() {
        let raw = night(
            "2024-01-01",
            "2024-01-01T23:00:00Z",
            "2024-01-02T07:00:00Z",
        );
        let derived = FeatureDeriver::derive(&raw).unwrap();
        assert_eq!(derived.duration_min, 480);
    }

    #[test]
    fn test_end_before_start_clamps_to_zero() {
        // Same-day wake time with no rollover applied
        let raw = night(
            "2024-01-01",
            "2024-01-01T23:00:00Z",
            "2024-01-01T07:00:00Z",
        );
        let derived = FeatureDeriver::derive(&raw).unwrap();

        assert_eq!(derived.duration_min, 0);
        assert_eq!(derived.midsleep_min_epoch, derived.start_min_epoch);
    }

    #[test]
    fn test_equal_start_and_end() {
        let raw = night(
            "2024-01-01",
            "2024-01-01T23:00:00Z",
            "2024-01-01T23:00:00Z",
        );
        let derived = FeatureDeriver::derive(&raw).unwrap();
        assert_eq!(derived.duration_min, 0);
    }

    #[test]
    fn test_sub_minute_precision_is_floored() {
        assert_eq!(parse_epoch_minutes("1970-01-01T00:01:59Z"), Some(1));
        assert_eq!(parse_epoch_minutes("1970-01-01T00:01:00.999Z"), Some(1));
        // Floor, not truncation toward zero, before the epoch
        assert_eq!(parse_epoch_minutes("1969-12-31T23:59:30Z"), Some(-1));
    }

    #[test]
    fn test_offsets_normalized_to_utc() {
        let with_offset = parse_epoch_minutes("2024-01-01T03:00:00+02:00").unwrap();
        let utc = parse_epoch_minutes("2024-01-01T01:00:00Z").unwrap();
        assert_eq!(with_offset, utc);
    }

    #[test]
    fn test_naive_timestamps_taken_as_utc() {
        let utc = parse_epoch_minutes("2024-01-01T01:00:00Z").unwrap();
        assert_eq!(parse_epoch_minutes("2024-01-01T01:00:00"), Some(utc));
        assert_eq!(parse_epoch_minutes("2024-01-01 01:00:00"), Some(utc));
        assert_eq!(parse_epoch_minutes("2024-01-01T01:00"), Some(utc));
    }

    #[test]
    fn test_invalid_timestamp_names_field() {
        let raw = night("2024-01-03", "last tuesday", "2024-01-03T07:00:00Z");
        let err = FeatureDeriver::derive(&raw).unwrap_err();

        match err {
            DriftError::InvalidTimestamp { context, value } => {
                assert!(context.contains("sleep_start"));
                assert!(context.contains("2024-01-03"));
                assert_eq!(value, "last tuesday");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_clock_minutes_wraps_at_noon() {
        assert_eq!(clock_minutes(480), 480);
        assert_eq!(clock_minutes(720), 720);
        assert_eq!(clock_minutes(721), -719);
        assert_eq!(clock_minutes(23 * 60 + 30), -30);
        // Whole days are dropped
        assert_eq!(clock_minutes(3 * MINUTES_PER_DAY + 30), 30);
        assert_eq!(clock_minutes(-30), -30);
    }

    #[test]
    fn test_midsleep_clock_projection() {
        let raw = night(
            "2024-01-01",
            "2024-01-01T23:00:00Z",
            "2024-01-02T07:00:00Z",
        );
        let derived = FeatureDeriver::derive(&raw).unwrap();
        // Midsleep at 03:00 UTC
        assert_eq!(derived.midsleep_clock_min, 180);
    }

    #[test]
    fn test_order_by_recency() {
        let mut nights = FeatureDeriver::derive_all(&[
            night("2024-01-01", "2024-01-01T00:00:00Z", "2024-01-01T08:00:00Z"),
            night("2024-01-03", "2024-01-03T00:00:00Z", "2024-01-03T08:00:00Z"),
            night("2024-01-02", "2024-01-02T00:00:00Z", "2024-01-02T08:00:00Z"),
        ])
        .unwrap();

        FeatureDeriver::order_by_recency(&mut nights);

        let dates: Vec<&str> = nights.iter().map(|n| n.raw.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-02", "2024-01-01"]);
    }

    #[test]
    fn test_order_by_recency_uses_parsed_dates() {
        // Unpadded keys: "2024-1-9" > "2024-1-10" as strings
        let mut nights = FeatureDeriver::derive_all(&[
            night("2024-1-9", "2024-01-09T00:00:00Z", "2024-01-09T08:00:00Z"),
            night("2024-1-10", "2024-01-10T00:00:00Z", "2024-01-10T08:00:00Z"),
            night("2024-1-8", "2024-01-08T00:00:00Z", "2024-01-08T08:00:00Z"),
        ])
        .unwrap();

        FeatureDeriver::order_by_recency(&mut nights);

        let dates: Vec<&str> = nights.iter().map(|n| n.raw.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-1-10", "2024-1-9", "2024-1-8"]);
    }

    #[test]
    fn test_invalid_date_key_rejected() {
        for date in ["yesterday", "2024-13-01", "01/02/2024", ""] {
            let raw = night(date, "2024-01-03T00:00:00Z", "2024-01-03T07:00:00Z");
            match FeatureDeriver::derive(&raw).unwrap_err() {
                DriftError::InvalidDate { context, value } => {
                    assert_eq!(context, "date");
                    assert_eq!(value, date);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_canonicalize_pads_date() {
        let raw = night("2024-1-5", "2024-01-05T00:00:00Z", "2024-01-05T08:00:00Z");
        let canonical = FeatureDeriver::canonicalize(raw).unwrap();

        assert_eq!(canonical.date, "2024-01-05");
        assert_eq!(canonical.sleep_start, "2024-01-05T00:00:00Z");
    }

    #[test]
    fn test_unwrap_clock_picks_nearest_copy() {
        // 11:50 against a 12:10 reference projected to -710
        assert_eq!(unwrap_clock(710, -710), -730);
        assert_eq!(unwrap_clock(-710, 710), 730);
        // Around midnight nothing moves
        assert_eq!(unwrap_clock(-10, 10), -10);
        assert_eq!(unwrap_clock(480, 690), 480);
        // Half a day away stays on the later side
        assert_eq!(unwrap_clock(720, 0), 720);
        assert_eq!(unwrap_clock(-720, 0), 720);
    }

    #[test]
    fn test_derive_all_fails_fast() {
        let result = FeatureDeriver::derive_all(&[
            night("2024-01-01", "2024-01-01T00:00:00Z", "2024-01-01T08:00:00Z"),
            night("2024-01-02", "2024-01-02T00:00:00Z", "not a time"),
        ]);
        assert!(matches!(result, Err(DriftError::InvalidTimestamp { .. })));
    }
}
