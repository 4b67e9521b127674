use serde::{Deserialize, Serialize};

/// Policy thresholds for the rule overlay. Defaults mirror the thresholds the
/// mentoring team signed off on; deployments may tune them via `AppConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub attendance_threshold: f64,
    pub score_threshold: f64,
    pub grade_velocity_threshold: f64,
    pub financial_stress_threshold: f64,
    pub career_confidence_threshold: f64,
    /// Score contribution of each wellness factor. Zero keeps them as
    /// explanation-only factors.
    pub wellness_weight: u32,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            attendance_threshold: 75.0,
            score_threshold: 60.0,
            grade_velocity_threshold: -10.0,
            financial_stress_threshold: 4.0,
            career_confidence_threshold: 2.0,
            wellness_weight: 0,
        }
    }
}
