//! Engine configuration
//!
//! The window size, drift threshold and evidence floor are passed explicitly to
//! the calculator and classifier through [`DriftConfig`].

use crate::error::DriftError;
use crate::types::DerivedNight;
use serde::{Deserialize, Serialize};

/// Default baseline window in nights
pub const BASELINE_WINDOW_DAYS: usize = 7;

/// Default lateness (minutes, inclusive) that counts as drift
pub const DRIFT_THRESHOLD_MIN: i64 = 90;

/// Default minimum coverage before the classifier commits to a label
pub const MIN_NIGHTS_FOR_DECISION: usize = 3;

/// Which midsleep value the baseline is averaged over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MidsleepAxis {
    /// UTC clock minutes, unwrapped around the latest night; comparable across
    /// calendar days wherever the sleeper's midsleep falls
    #[default]
    Clock,
    /// Absolute minutes since the Unix epoch
    Epoch,
}

impl MidsleepAxis {
    /// Midsleep of a night on this axis
    pub fn midsleep(&self, night: &DerivedNight) -> i64 {
        match self {
            MidsleepAxis::Clock => night.midsleep_clock_min,
            MidsleepAxis::Epoch => night.midsleep_min_epoch,
        }
    }
}

/// Parameters for the baseline, drift and risk stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Number of most recent nights in the baseline window
    pub baseline_window_days: usize,
    /// Absolute lateness in minutes at or above which drift is flagged
    pub drift_threshold_min: i64,
    /// Coverage below which the label is `INSUFFICIENT_DATA`
    pub min_nights_for_decision: usize,
    /// Midsleep value the baseline is computed on
    pub midsleep_axis: MidsleepAxis,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            baseline_window_days: BASELINE_WINDOW_DAYS,
            drift_threshold_min: DRIFT_THRESHOLD_MIN,
            min_nights_for_decision: MIN_NIGHTS_FOR_DECISION,
            midsleep_axis: MidsleepAxis::Clock,
        }
    }
}

impl DriftConfig {
    /// Reject configurations the engine cannot use
    pub fn validate(&self) -> Result<(), DriftError> {
        if self.baseline_window_days == 0 {
            return Err(DriftError::InvalidConfig(
                "baseline_window_days must be at least 1".to_string(),
            ));
        }
        if self.min_nights_for_decision == 0 {
            return Err(DriftError::InvalidConfig(
                "min_nights_for_decision must be at least 1".to_string(),
            ));
        }
        if self.drift_threshold_min < 0 {
            return Err(DriftError::InvalidConfig(format!(
                "drift_threshold_min must be non-negative, got {}",
                self.drift_threshold_min
            )));
        }
        Ok(())
    }

    /// Load and validate a configuration from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, DriftError> {
        let config: DriftConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
