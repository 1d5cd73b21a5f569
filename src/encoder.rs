//! Nudge report encoding
//!
//! This module turns an assessment into the payload the notification
//! dispatcher consumes: the label, the numbers behind it, and a rendered
//! explanation with the baseline shown as a clock time.

use crate::config::DriftConfig;
use crate::error::DriftError;
use crate::features::MINUTES_PER_DAY;
use crate::types::{Assessment, NudgeProducer, NudgeReport, RiskLabel};
use crate::{DRIFT_VERSION, PRODUCER_NAME};
use chrono::Utc;
use uuid::Uuid;

/// Current nudge report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Nudge encoder for producing report payloads
pub struct NudgeEncoder {
    instance_id: String,
}

impl Default for NudgeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl NudgeEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode an assessment into a nudge report
    pub fn encode(&self, assessment: &Assessment, config: &DriftConfig) -> NudgeReport {
        let producer = NudgeProducer {
            name: PRODUCER_NAME.to_string(),
            version: DRIFT_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        NudgeReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            computed_at_utc: Utc::now().to_rfc3339(),
            label: assessment.label,
            should_nudge: assessment.label.should_nudge(),
            stats: assessment.stats,
            baseline_mid_clock: assessment.stats.baseline_mid.map(format_clock),
            most_recent_date: assessment.most_recent_date.clone(),
            explanation: explain(assessment),
            config: *config,
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        assessment: &Assessment,
        config: &DriftConfig,
    ) -> Result<String, DriftError> {
        let report = self.encode(assessment, config);
        serde_json::to_string_pretty(&report).map_err(DriftError::JsonError)
    }
}

/// Format minutes as a UTC wall clock time (HH:MM); whole days are dropped
pub fn format_clock(minutes: i64) -> String {
    let minute_of_day = minutes.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

/// Format a signed minute count as e.g. `+3h00m`, `-45m` or `0m`
pub fn format_signed_duration(minutes: i64) -> String {
    let sign = match minutes.signum() {
        1 => "+",
        -1 => "-",
        _ => "",
    };
    format!("{}{}", sign, format_duration(minutes.abs()))
}

fn format_duration(minutes: i64) -> String {
    let (hours, mins) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{hours}h{mins:02}m")
    } else {
        format!("{mins}m")
    }
}

/// Render the explanation shown alongside a nudge
pub fn explain(assessment: &Assessment) -> String {
    let stats = &assessment.stats;

    let baseline_mid = match (assessment.label, stats.baseline_mid) {
        (RiskLabel::InsufficientData, _) | (_, None) => {
            let needed = assessment
                .min_nights_for_decision
                .saturating_sub(stats.coverage)
                .max(1);
            let noun = if needed == 1 { "night" } else { "nights" };
            return format!(
                "Not enough sleep history yet: {} of {} nights logged. Log {} more {} to get a drift check.",
                stats.coverage, assessment.min_nights_for_decision, needed, noun
            );
        }
        (_, Some(mid)) => mid,
    };

    let headline = match assessment.label {
        RiskLabel::High => "Your sleep timing has drifted.",
        _ => "Your sleep timing is on track.",
    };

    let offset = match stats.recent_lateness.signum() {
        1 => format!("{} later than usual", format_duration(stats.recent_lateness)),
        -1 => format!("{} earlier than usual", format_duration(-stats.recent_lateness)),
        _ => "right on your usual time".to_string(),
    };

    format!(
        "{} Usual midsleep is {}; last night's midsleep was {}. Regularity loss over the last {} nights: {} min.",
        headline,
        format_clock(baseline_mid),
        offset,
        stats.coverage,
        stats.regularity_loss
    )
}
