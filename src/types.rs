//! Core types for the Sleep Drift engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: raw nights, derived nights, drift statistics and the risk assessment.

use crate::config::DriftConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One night of sleep timing as it was logged or imported.
///
/// Timestamps are kept as the strings they arrived as; the feature deriver is
/// responsible for parsing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNight {
    /// Calendar date this night is filed under (YYYY-MM-DD), the storage key.
    /// Ingestion rewrites parseable dates into this zero-padded form.
    pub date: String,
    /// Sleep onset (ISO-8601)
    pub sleep_start: String,
    /// Wake time (ISO-8601), may fall on the next calendar day
    pub sleep_end: String,
}

impl RawNight {
    pub fn new(
        date: impl Into<String>,
        sleep_start: impl Into<String>,
        sleep_end: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            sleep_start: sleep_start.into(),
            sleep_end: sleep_end.into(),
        }
    }
}

/// A raw night with its timing features resolved to UTC epoch minutes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedNight {
    /// Source raw night
    pub raw: RawNight,
    /// Parsed storage key, used for recency ordering
    pub night_date: NaiveDate,
    /// Sleep onset, floored to whole minutes since the Unix epoch
    pub start_min_epoch: i64,
    /// Wake time, floored to whole minutes since the Unix epoch
    pub end_min_epoch: i64,
    /// Time asleep in minutes, never negative
    pub duration_min: i64,
    /// Midpoint of the sleep interval in minutes since the Unix epoch
    pub midsleep_min_epoch: i64,
    /// Midpoint as UTC clock minutes, wrapped at noon into `-719..=720`
    pub midsleep_clock_min: i64,
}

/// Drift statistics over a baseline window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DriftStats {
    /// Number of nights in the window
    pub coverage: usize,
    /// Floored mean midsleep on the configured axis, `None` for an empty window
    pub baseline_mid: Option<i64>,
    /// Signed minutes the most recent midsleep sits after the baseline
    pub recent_lateness: i64,
    /// Sum of absolute midsleep deviations from the baseline (minutes)
    pub regularity_loss: i64,
    /// Whether the most recent night is far enough off baseline to count as drift
    pub drift: bool,
}

/// Risk label consumed by the nudge dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLabel {
    InsufficientData,
    Low,
    High,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::InsufficientData => "INSUFFICIENT_DATA",
            RiskLabel::Low => "LOW",
            RiskLabel::High => "HIGH",
        }
    }

    /// Whether this label should trigger a user-facing nudge
    pub fn should_nudge(&self) -> bool {
        matches!(self, RiskLabel::High)
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stats plus the label derived from them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub stats: DriftStats,
    pub label: RiskLabel,
    /// Date key of the night the lateness was measured on
    pub most_recent_date: Option<String>,
    /// Minimum coverage the classifier required
    pub min_nights_for_decision: usize,
}

/// Outcome of a CSV import, for "N of M rows imported" reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Rows accepted into the store
    pub imported: usize,
    /// Data rows present in the input (header excluded)
    pub total_rows: usize,
    /// Rows skipped for missing fields
    pub skipped_rows: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} rows imported", self.imported, self.total_rows)
    }
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Decision payload handed to the notification dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NudgeReport {
    pub report_version: String,
    pub producer: NudgeProducer,
    pub computed_at_utc: String,
    pub label: RiskLabel,
    pub should_nudge: bool,
    pub stats: DriftStats,
    /// Baseline midsleep as a UTC wall clock time (HH:MM)
    pub baseline_mid_clock: Option<String>,
    pub most_recent_date: Option<String>,
    /// Human-readable explanation of the decision
    pub explanation: String,
    pub config: DriftConfig,
}
