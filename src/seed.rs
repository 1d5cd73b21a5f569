//! Synthetic sleep history
//!
//! Generates a deterministic run of nights for demos and tests. Bedtimes wobble
//! by a fixed jitter pattern; an optional shift pushes the final night later so
//! the history shows drift.

use crate::error::DriftError;
use crate::features::DATE_FORMAT;
use crate::types::RawNight;
use chrono::{Duration, NaiveDate, NaiveTime, SecondsFormat};

/// Bedtime offsets in minutes, cycled across generated nights
const JITTER_PATTERN_MIN: [i64; 7] = [0, 10, -15, 5, -5, 15, -10];

/// Options for [`synthetic_nights`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOptions {
    /// Date key of the last generated night
    pub end_date: NaiveDate,
    /// Number of consecutive nights
    pub nights: usize,
    /// Bedtime as minutes after midnight UTC of the night's date (may be negative)
    pub bedtime_min: i64,
    /// Sleep duration in minutes
    pub duration_min: i64,
    /// Apply the jitter pattern to bedtimes
    pub jitter: bool,
    /// Extra minutes added to the final night's bedtime
    pub late_shift_min: i64,
}

impl SeedOptions {
    /// A regular week ending on `end_date`: 00:30 bedtime, 7h30m asleep
    pub fn ending(end_date: NaiveDate) -> Self {
        Self {
            end_date,
            nights: 7,
            bedtime_min: 30,
            duration_min: 450,
            jitter: true,
            late_shift_min: 0,
        }
    }
}

/// Generate nights ordered by date ascending.
///
/// Fails with [`DriftError::SeedOutOfRange`] when the options push a date or
/// timestamp outside the representable calendar.
pub fn synthetic_nights(options: &SeedOptions) -> Result<Vec<RawNight>, DriftError> {
    let count = i64::try_from(options.nights)
        .map_err(|_| out_of_range(format!("{} nights", options.nights)))?;

    (0..count)
        .map(|i| {
            let date = Duration::try_days(count - 1 - i)
                .and_then(|back| options.end_date.checked_sub_signed(back))
                .ok_or_else(|| out_of_range(format!("{} nights before {}", count, options.end_date)))?;
            let midnight = date.and_time(NaiveTime::default()).and_utc();

            let mut bedtime = Some(options.bedtime_min);
            if options.jitter {
                let jitter = JITTER_PATTERN_MIN[i as usize % JITTER_PATTERN_MIN.len()];
                bedtime = bedtime.and_then(|b| b.checked_add(jitter));
            }
            if i == count - 1 {
                bedtime = bedtime.and_then(|b| b.checked_add(options.late_shift_min));
            }

            let start = bedtime
                .and_then(Duration::try_minutes)
                .and_then(|offset| midnight.checked_add_signed(offset))
                .ok_or_else(|| out_of_range(format!("bedtime for night {}", date)))?;
            let end = Duration::try_minutes(options.duration_min.max(0))
                .and_then(|length| start.checked_add_signed(length))
                .ok_or_else(|| out_of_range(format!("wake time for night {}", date)))?;

            Ok(RawNight::new(
                date.format(DATE_FORMAT).to_string(),
                start.to_rfc3339_opts(SecondsFormat::Millis, true),
                end.to_rfc3339_opts(SecondsFormat::Millis, true),
            ))
        })
        .collect()
}

fn out_of_range(what: String) -> DriftError {
    DriftError::SeedOutOfRange(what)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::BaselineCalculator;
    use crate::config::DriftConfig;

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_generates_consecutive_dates() {
        let nights = synthetic_nights(&SeedOptions::ending(jan(10))).unwrap();

        assert_eq!(nights.len(), 7);
        assert_eq!(nights[0].date, "2024-01-04");
        assert_eq!(nights[6].date, "2024-01-10");
        assert_eq!(nights[0].sleep_start, "2024-01-04T00:30:00.000Z");
        assert_eq!(nights[0].sleep_end, "2024-01-04T08:00:00.000Z");
    }

    #[test]
    fn test_is_deterministic() {
        let options = SeedOptions::ending(jan(10));
        assert_eq!(synthetic_nights(&options).unwrap(), synthetic_nights(&options).unwrap());
    }

    #[test]
    fn test_negative_bedtime_starts_previous_evening() {
        let options = SeedOptions {
            nights: 1,
            bedtime_min: -60,
            jitter: false,
            ..SeedOptions::ending(jan(10))
        };
        let nights = synthetic_nights(&options).unwrap();

        assert_eq!(nights[0].date, "2024-01-10");
        assert_eq!(nights[0].sleep_start, "2024-01-09T23:00:00.000Z");
    }

    #[test]
    fn test_regular_week_has_no_drift() {
        let nights = synthetic_nights(&SeedOptions::ending(jan(10))).unwrap();
        let stats = BaselineCalculator::compute_from_nights(&nights, &DriftConfig::default()).unwrap();

        assert_eq!(stats.coverage, 7);
        assert!(!stats.drift);
    }

    #[test]
    fn test_late_shift_produces_drift() {
        let options = SeedOptions {
            late_shift_min: 210,
            jitter: false,
            ..SeedOptions::ending(jan(10))
        };
        let nights = synthetic_nights(&options).unwrap();
        let stats = BaselineCalculator::compute_from_nights(&nights, &DriftConfig::default()).unwrap();

        assert_eq!(stats.recent_lateness, 180);
        assert!(stats.drift);
    }

    #[test]
    fn test_out_of_range_options_are_errors() {
        let huge_shift = SeedOptions {
            late_shift_min: i64::MAX / 2,
            ..SeedOptions::ending(jan(10))
        };
        assert!(matches!(
            synthetic_nights(&huge_shift),
            Err(DriftError::SeedOutOfRange(_))
        ));

        let overflowing_shift = SeedOptions {
            late_shift_min: i64::MAX,
            ..SeedOptions::ending(jan(10))
        };
        assert!(matches!(
            synthetic_nights(&overflowing_shift),
            Err(DriftError::SeedOutOfRange(_))
        ));

        let long_duration = SeedOptions {
            duration_min: i64::MAX,
            ..SeedOptions::ending(jan(10))
        };
        assert!(matches!(
            synthetic_nights(&long_duration),
            Err(DriftError::SeedOutOfRange(_))
        ));

        let too_many_nights = SeedOptions {
            nights: 1_000_000_000,
            ..SeedOptions::ending(jan(10))
        };
        assert!(matches!(
            synthetic_nights(&too_many_nights),
            Err(DriftError::SeedOutOfRange(_))
        ));
    }

    #[test]
    fn test_zero_nights_is_empty() {
        let options = SeedOptions {
            nights: 0,
            ..SeedOptions::ending(jan(10))
        };
        assert!(synthetic_nights(&options).unwrap().is_empty());
    }
}
