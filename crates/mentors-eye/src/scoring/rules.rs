use super::config::RuleConfig;
use super::features::grade_velocity;
use super::record::{fields, FeeStatus, StudentRecord};
use super::RiskFactor;

pub const LOW_ATTENDANCE: &str = "Low Attendance";
pub const LOW_AVERAGE_SCORE: &str = "Low Average Score";
pub const OVERDUE_FEES: &str = "Overdue Fees";
pub const DECLINING_GRADES: &str = "Declining Grades";
pub const HIGH_FINANCIAL_STRESS: &str = "High Financial Stress";
pub const HEALTH_IMPACT: &str = "Health Issues Impacting Study";
pub const LOW_CAREER_CONFIDENCE: &str = "Low Career Confidence";

/// Triggered factors in rule-table order plus the score sum, unclamped but
/// saturating rather than overflowing.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub score: u32,
    pub factors: Vec<RiskFactor>,
}

impl RuleOutcome {
    fn trigger(&mut self, delta: u32, text: &str, importance: f64) {
        self.score = self.score.saturating_add(delta);
        self.factors.push(RiskFactor::new(text, importance));
    }
}

/// Applies every threshold rule independently. Absent or unreadable optional
/// fields never trigger a rule.
pub fn evaluate_rules(record: &StudentRecord, config: &RuleConfig) -> RuleOutcome {
    let mut outcome = RuleOutcome {
        score: 0,
        factors: Vec::new(),
    };
    let number = |field: &str| record.number(field).ok().flatten();

    if number(fields::ATTENDANCE).is_some_and(|value| value < config.attendance_threshold) {
        outcome.trigger(25, LOW_ATTENDANCE, 0.8);
    }

    if number(fields::AVERAGE_SCORE).is_some_and(|value| value < config.score_threshold) {
        outcome.trigger(25, LOW_AVERAGE_SCORE, 0.9);
    }

    if record.fee_status() == Ok(FeeStatus::Overdue) {
        outcome.trigger(20, OVERDUE_FEES, 0.7);
    }

    if grade_velocity(record) < config.grade_velocity_threshold {
        outcome.trigger(30, DECLINING_GRADES, 1.0);
    }

    if number(fields::FINANCIAL_STRESS)
        .is_some_and(|value| value >= config.financial_stress_threshold)
    {
        outcome.trigger(config.wellness_weight, HIGH_FINANCIAL_STRESS, 0.6);
    }

    if record.flag(fields::HEALTH_IMPACT) == Some(true) {
        outcome.trigger(config.wellness_weight, HEALTH_IMPACT, 0.5);
    }

    if number(fields::CAREER_CONFIDENCE)
        .is_some_and(|value| value <= config.career_confidence_threshold)
    {
        outcome.trigger(config.wellness_weight, LOW_CAREER_CONFIDENCE, 0.4);
    }

    outcome
}
