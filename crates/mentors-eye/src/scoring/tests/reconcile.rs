use std::collections::BTreeMap;

use crate::scoring::policy::{AT_RISK_PATTERN, ESCALATED_SCORE_FLOOR};
use crate::scoring::{reconcile, RiskFactor, RiskLevel};

fn probabilities() -> BTreeMap<String, u8> {
    BTreeMap::from([
        ("Dropout".to_string(), 70),
        ("Enrolled".to_string(), 20),
        ("Graduate".to_string(), 10),
    ])
}

#[test]
fn score_bands_map_to_levels() {
    assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(29), RiskLevel::Low);
    assert_eq!(RiskLevel::from_score(30), RiskLevel::Medium);
    assert_eq!(RiskLevel::from_score(59), RiskLevel::Medium);
    assert_eq!(RiskLevel::from_score(60), RiskLevel::High);
    assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
}

#[test]
fn clean_record_predicted_to_drop_out_is_escalated() {
    let verdict = reconcile(Some("Dropout"), probabilities(), 0, Vec::new());

    assert_eq!(verdict.level(), RiskLevel::Medium);
    assert_eq!(verdict.score(), ESCALATED_SCORE_FLOOR);
    assert_eq!(verdict.factors(), &[RiskFactor::new(AT_RISK_PATTERN, 0.6)]);
}

#[test]
fn escalation_keeps_existing_reasons_and_higher_scores() {
    let factors = vec![RiskFactor::new("Low Career Confidence", 0.4)];

    let verdict = reconcile(Some("Dropout"), probabilities(), 25, factors.clone());

    assert_eq!(verdict.level(), RiskLevel::Medium);
    assert_eq!(verdict.score(), 40);
    assert_eq!(verdict.factors(), factors.as_slice());
}

#[test]
fn medium_rule_score_is_not_escalated_further() {
    let factors = vec![RiskFactor::new("Low Attendance", 0.8)];

    let verdict = reconcile(Some("Dropout"), probabilities(), 45, factors);

    assert_eq!(verdict.level(), RiskLevel::Medium);
    assert_eq!(verdict.score(), 45);
    assert_eq!(verdict.factors().len(), 1);
}

#[test]
fn other_predictions_leave_low_records_alone() {
    let verdict = reconcile(Some("Enrolled"), probabilities(), 20, Vec::new());

    assert_eq!(verdict.level(), RiskLevel::Low);
    assert_eq!(verdict.score(), 20);
    assert!(verdict.factors().is_empty());
}

#[test]
fn rules_only_verdicts_never_escalate() {
    let verdict = reconcile(None, BTreeMap::new(), 0, Vec::new());

    assert_eq!(verdict.level(), RiskLevel::Low);
    assert!(verdict.probabilities().is_empty());
}

#[test]
fn oversized_rule_scores_are_clamped() {
    let verdict = reconcile(Some("Graduate"), probabilities(), 145, Vec::new());

    assert_eq!(verdict.score(), 100);
    assert_eq!(verdict.level(), RiskLevel::High);
}

#[test]
fn factors_sort_by_importance_and_keep_table_order_on_ties() {
    let factors = vec![
        RiskFactor::new("Low Attendance", 0.8),
        RiskFactor::new("Overdue Fees", 0.7),
        RiskFactor::new("Declining Grades", 1.0),
        RiskFactor::new("Tie A", 0.7),
        RiskFactor::new("Tie B", 0.7),
    ];

    let verdict = reconcile(Some("Graduate"), probabilities(), 75, factors);

    let texts: Vec<&str> = verdict.factors().iter().map(|f| f.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["Declining Grades", "Low Attendance", "Overdue Fees", "Tie A", "Tie B"]
    );
}

#[test]
fn probabilities_are_carried_through_unchanged() {
    let verdict = reconcile(Some("Dropout"), probabilities(), 80, Vec::new());

    assert_eq!(verdict.probabilities(), &probabilities());
}

#[test]
fn verdict_serializes_with_external_field_names() {
    let verdict = reconcile(
        Some("Graduate"),
        probabilities(),
        25,
        vec![RiskFactor::new("Low Attendance", 0.8)],
    );

    let json = serde_json::to_value(&verdict).expect("serializes");

    assert_eq!(json["level"], "Low");
    assert_eq!(json["score"], 25);
    assert_eq!(json["probabilities"]["Dropout"], 70);
    assert_eq!(json["factors"][0]["text"], "Low Attendance");
    assert_eq!(json["factors"][0]["importance"], 0.8);
}
