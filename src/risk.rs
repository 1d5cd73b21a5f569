//! Risk classification
//!
//! Maps drift statistics to the label the nudge dispatcher acts on. A window
//! with fewer than `min_nights_for_decision` nights is never classified, no
//! matter what the drift flag says.

use crate::types::{DriftStats, RiskLabel};

pub struct RiskClassifier;

impl RiskClassifier {
    pub fn classify(stats: &DriftStats, min_nights_for_decision: usize) -> RiskLabel {
        if stats.coverage < min_nights_for_decision {
            RiskLabel::InsufficientData
        } else if stats.drift {
            RiskLabel::High
        } else {
            RiskLabel::Low
        }
    }
}
