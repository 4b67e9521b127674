use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{RiskFactor, RiskVerdict};

pub const DROPOUT_LABEL: &str = "Dropout";
pub const HIGH_RISK_SCORE: u8 = 60;
pub const MEDIUM_RISK_SCORE: u8 = 30;
pub const ESCALATED_SCORE_FLOOR: u8 = 40;
pub const AT_RISK_PATTERN: &str = "At-Risk Pattern Detected";

/// Discrete risk band shown on the mentor dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_RISK_SCORE {
            RiskLevel::High
        } else if score >= MEDIUM_RISK_SCORE {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

/// Merges classifier output with the rule overlay.
///
/// A record the rules consider low risk is escalated to `Medium` when the
/// classifier predicts dropout, with the score floored at 40 and a synthetic
/// factor added when the rules gave no reason. `predicted_label` is `None` only
/// for explicitly requested rules-only scoring.
pub fn reconcile(
    predicted_label: Option<&str>,
    probabilities: BTreeMap<String, u8>,
    rule_score: u32,
    mut factors: Vec<RiskFactor>,
) -> RiskVerdict {
    let mut score = rule_score.min(100) as u8;
    let mut level = RiskLevel::from_score(score);

    if level == RiskLevel::Low && predicted_label == Some(DROPOUT_LABEL) {
        level = RiskLevel::Medium;
        score = score.max(ESCALATED_SCORE_FLOOR);

        if factors.is_empty() {
            factors.push(RiskFactor::new(AT_RISK_PATTERN, 0.6));
        }
    }

    factors.sort_by(|left, right| right.importance.total_cmp(&left.importance));

    RiskVerdict {
        level,
        score,
        probabilities,
        factors,
    }
}
