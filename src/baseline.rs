//! Baseline and drift calculation
//!
//! This module computes a rolling midsleep baseline over the most recent
//! nights and measures how far the latest night has drifted from it.
//! Baselines are recomputed from a snapshot on every call; no rolling state is
//! kept between calls.

use crate::config::{DriftConfig, MidsleepAxis};
use crate::error::DriftError;
use crate::features::{clock_minutes, unwrap_clock, FeatureDeriver};
use crate::types::{DerivedNight, DriftStats, RawNight};

/// Baseline calculator for drift statistics
pub struct BaselineCalculator;

impl BaselineCalculator {
    /// Compute drift statistics for a window ordered most-recent-first.
    ///
    /// The window is used as given; call [`select_window`] first to order and
    /// truncate a history.
    pub fn compute(window: &[DerivedNight], config: &DriftConfig) -> DriftStats {
        let coverage = window.len();
        if coverage == 0 {
            return DriftStats::default();
        }

        let mut mids: Vec<i64> = window
            .iter()
            .map(|night| config.midsleep_axis.midsleep(night))
            .collect();
        if config.midsleep_axis == MidsleepAxis::Clock {
            // Measure every night against its nearest copy of the latest one
            let reference = mids[0];
            for mid in mids.iter_mut() {
                *mid = unwrap_clock(*mid, reference);
            }
        }
        let mean_mid = floor_mean(&mids);

        // mids[0] is the most recent night
        let recent_lateness = mids[0] - mean_mid;
        let regularity_loss = if coverage <= 1 {
            0
        } else {
            mids.iter().map(|mid| (mid - mean_mid).abs()).sum()
        };
        let drift = recent_lateness.abs() >= config.drift_threshold_min;

        let baseline_mid = match config.midsleep_axis {
            MidsleepAxis::Clock => clock_minutes(mean_mid),
            MidsleepAxis::Epoch => mean_mid,
        };

        DriftStats {
            coverage,
            baseline_mid: Some(baseline_mid),
            recent_lateness,
            regularity_loss,
            drift,
        }
    }

    /// Derive, select and compute in one step from raw nights
    pub fn compute_from_nights(
        nights: &[RawNight],
        config: &DriftConfig,
    ) -> Result<DriftStats, DriftError> {
        let derived = FeatureDeriver::derive_all(nights)?;
        let window = select_window(derived, config.baseline_window_days);
        Ok(Self::compute(&window, config))
    }
}

/// Order derived nights most-recent-first and keep at most `window_days`
pub fn select_window(mut nights: Vec<DerivedNight>, window_days: usize) -> Vec<DerivedNight> {
    FeatureDeriver::order_by_recency(&mut nights);
    let available = nights.len();
    nights.truncate(window_days);
    log::debug!(
        "baseline window holds {} of {} available nights",
        nights.len(),
        available
    );
    nights
}

/// Floor of the arithmetic mean; callers guarantee a non-empty slice
fn floor_mean(values: &[i64]) -> i64 {
    let sum: i128 = values.iter().map(|&v| v as i128).sum();
    sum.div_euclid(values.len() as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    /// Build a window (most-recent-first) from clock midsleep values
    fn window_from_mids(mids: &[i64]) -> Vec<DerivedNight> {
        mids.iter()
            .enumerate()
            .map(|(i, &mid)| DerivedNight {
                raw: RawNight::new(format!("night-{i}"), "", ""),
                night_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap() - Duration::days(i as i64),
                start_min_epoch: mid - 240,
                end_min_epoch: mid + 240,
                duration_min: 480,
                midsleep_min_epoch: mid,
                midsleep_clock_min: mid,
            })
            .collect()
    }

    fn with_threshold(drift_threshold_min: i64) -> DriftConfig {
        DriftConfig {
            drift_threshold_min,
            ..Default::default()
        }
    }

    /// Night filed under 2024-01-`day`; an `end` at or before `start` wakes the next day
    fn nightly(day: u32, start: &str, end: &str) -> RawNight {
        let end_day = if end <= start { day + 1 } else { day };
        RawNight::new(
            format!("2024-01-{day:02}"),
            format!("2024-01-{day:02}T{start}:00Z"),
            format!("2024-01-{end_day:02}T{end}:00Z"),
        )
    }

    #[test]
    fn test_empty_window() {
        let stats = BaselineCalculator::compute(&[], &DriftConfig::default());

        assert_eq!(stats.coverage, 0);
        assert_eq!(stats.baseline_mid, None);
        assert_eq!(stats.recent_lateness, 0);
        assert_eq!(stats.regularity_loss, 0);
        assert!(!stats.drift);
    }

    #[test]
    fn test_single_night() {
        let stats = BaselineCalculator::compute(&window_from_mids(&[500]), &DriftConfig::default());

        assert_eq!(stats.coverage, 1);
        assert_eq!(stats.baseline_mid, Some(500));
        assert_eq!(stats.recent_lateness, 0);
        assert_eq!(stats.regularity_loss, 0);
        assert!(!stats.drift);
    }

    #[test]
    fn test_constant_midsleep_has_no_drift() {
        let stats =
            BaselineCalculator::compute(&window_from_mids(&[480; 5]), &DriftConfig::default());

        assert_eq!(stats.coverage, 5);
        assert_eq!(stats.baseline_mid, Some(480));
        assert_eq!(stats.recent_lateness, 0);
        assert_eq!(stats.regularity_loss, 0);
        assert!(!stats.drift);
    }

    #[test]
    fn test_late_final_night_scenario() {
        // Most recent night first: 210 minutes later than the six before it
        let window = window_from_mids(&[690, 480, 480, 480, 480, 480, 480]);
        let stats = BaselineCalculator::compute(&window, &DriftConfig::default());

        assert_eq!(stats.coverage, 7);
        assert_eq!(stats.baseline_mid, Some(510));
        assert_eq!(stats.recent_lateness, 180);
        // |690-510| + 6 * |480-510|
        assert_eq!(stats.regularity_loss, 180 + 6 * 30);
        assert!(stats.drift);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // Mean of [600, 420, 420, 420] is 465, lateness exactly 135
        let window = window_from_mids(&[600, 420, 420, 420]);

        let at = BaselineCalculator::compute(&window, &with_threshold(135));
        assert_eq!(at.recent_lateness, 135);
        assert!(at.drift);

        let above = BaselineCalculator::compute(&window, &with_threshold(136));
        assert!(!above.drift);
    }

    #[test]
    fn test_lateness_measured_against_pooled_mean() {
        // Latest night 90 minutes after the three before it; the baseline
        // includes the latest night, so the measured lateness is smaller
        let window = window_from_mids(&[570, 480, 480, 480]);
        let stats = BaselineCalculator::compute(&window, &DriftConfig::default());

        // Pooled mean is 502; the latest night sits 68 minutes after it
        assert_eq!(stats.baseline_mid, Some(502));
        assert_eq!(stats.recent_lateness, 68);
        assert!(!stats.drift);

        let stats = BaselineCalculator::compute(&window, &with_threshold(68));
        assert!(stats.drift);
    }

    #[test]
    fn test_early_night_counts_as_drift() {
        let window = window_from_mids(&[300, 480, 480, 480]);
        let stats = BaselineCalculator::compute(&window, &DriftConfig::default());

        assert_eq!(stats.baseline_mid, Some(435));
        assert_eq!(stats.recent_lateness, -135);
        assert!(stats.drift);
    }

    #[test]
    fn test_baseline_mean_floors() {
        // Mean 500.5 floors to 500
        let stats =
            BaselineCalculator::compute(&window_from_mids(&[501, 500]), &DriftConfig::default());
        assert_eq!(stats.baseline_mid, Some(500));
        assert_eq!(stats.recent_lateness, 1);

        // Mean -0.5 floors to -1, not 0
        let stats =
            BaselineCalculator::compute(&window_from_mids(&[0, -1]), &DriftConfig::default());
        assert_eq!(stats.baseline_mid, Some(-1));
    }

    #[test]
    fn test_window_straddling_noon_utc() {
        // Midsleep 11:50 UTC for six nights, then 12:10 UTC (20 minutes later)
        let mut nights: Vec<RawNight> = (1..=6).map(|day| nightly(day, "07:50", "15:50")).collect();
        nights.push(nightly(7, "08:10", "16:10"));

        let stats = BaselineCalculator::compute_from_nights(&nights, &DriftConfig::default()).unwrap();

        // Unwrapped around -710: six nights at -730, mean floors to -728
        assert_eq!(stats.baseline_mid, Some(712));
        assert_eq!(stats.recent_lateness, 18);
        assert_eq!(stats.regularity_loss, 6 * 2 + 18);
        assert!(!stats.drift);
    }

    #[test]
    fn test_window_straddling_noon_utc_earlier() {
        // Latest night falls just before the seam while the rest sit after it
        let mut nights: Vec<RawNight> = (1..=6).map(|day| nightly(day, "08:10", "16:10")).collect();
        nights.push(nightly(7, "07:50", "15:50"));

        let stats = BaselineCalculator::compute_from_nights(&nights, &DriftConfig::default()).unwrap();

        assert_eq!(stats.recent_lateness, -17);
        assert!(!stats.drift);
    }

    #[test]
    fn test_window_straddling_midnight_utc() {
        // Midsleeps 23:50, 00:10, 23:55, then 00:05
        let nights = vec![
            nightly(1, "19:50", "03:50"),
            nightly(2, "20:10", "04:10"),
            nightly(3, "19:55", "03:55"),
            nightly(4, "20:05", "04:05"),
        ];

        let stats = BaselineCalculator::compute_from_nights(&nights, &DriftConfig::default()).unwrap();

        // Clock values -10, 10, -5, 5: mean 0
        assert_eq!(stats.baseline_mid, Some(0));
        assert_eq!(stats.recent_lateness, 5);
        assert_eq!(stats.regularity_loss, 30);
        assert!(!stats.drift);
    }

    #[test]
    fn test_large_shift_across_noon_still_drifts() {
        // Midsleep 11:30 UTC, then 14:30 UTC
        let mut nights: Vec<RawNight> = (1..=6).map(|day| nightly(day, "07:30", "15:30")).collect();
        nights.push(nightly(7, "10:30", "18:30"));

        let stats = BaselineCalculator::compute_from_nights(&nights, &DriftConfig::default()).unwrap();

        // Mean of 690 x6 and 870 is 715.71, floored to 715
        assert_eq!(stats.baseline_mid, Some(715));
        assert_eq!(stats.recent_lateness, 155);
        assert!(stats.drift);
    }

    #[test]
    fn test_select_window_keeps_most_recent() {
        let nights: Vec<RawNight> = (1..=9).map(|day| nightly(day, "00:00", "08:00")).collect();
        let derived = FeatureDeriver::derive_all(&nights).unwrap();

        let window = select_window(derived, 7);

        assert_eq!(window.len(), 7);
        assert_eq!(window[0].raw.date, "2024-01-09");
        assert_eq!(window[6].raw.date, "2024-01-03");
    }

    #[test]
    fn test_regular_history_on_clock_axis() {
        let nights: Vec<RawNight> = (1..=7).map(|day| nightly(day, "00:00", "08:00")).collect();

        let stats = BaselineCalculator::compute_from_nights(&nights, &DriftConfig::default()).unwrap();

        assert_eq!(stats.coverage, 7);
        // 04:00 UTC every night
        assert_eq!(stats.baseline_mid, Some(240));
        assert_eq!(stats.recent_lateness, 0);
        assert!(!stats.drift);
    }

    #[test]
    fn test_epoch_axis_separates_days() {
        let nights: Vec<RawNight> = (1..=2).map(|day| nightly(day, "00:00", "08:00")).collect();
        let config = DriftConfig {
            midsleep_axis: MidsleepAxis::Epoch,
            ..Default::default()
        };

        let stats = BaselineCalculator::compute_from_nights(&nights, &config).unwrap();

        // Identical clock times one calendar day apart
        assert_eq!(stats.recent_lateness, 720);
        assert!(stats.drift);
    }

    #[test]
    fn test_window_size_limits_coverage() {
        let nights: Vec<RawNight> = (1..=9).map(|day| nightly(day, "00:00", "08:00")).collect();
        let config = DriftConfig {
            baseline_window_days: 4,
            ..Default::default()
        };

        let stats = BaselineCalculator::compute_from_nights(&nights, &config).unwrap();
        assert_eq!(stats.coverage, 4);
    }
}
