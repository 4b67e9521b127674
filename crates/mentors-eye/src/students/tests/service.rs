use super::common::*;
use std::sync::Arc;

use crate::scoring::record::fields;
use crate::scoring::{RiskEngine, RiskLevel, RuleConfig, ScoringError, ScoringMode, SchemaError};
use crate::students::domain::StudentId;
use crate::students::repository::RepositoryError;
use crate::students::service::{RiskAssessmentService, RiskServiceError};

#[test]
fn roster_lists_latest_snapshots_highest_risk_first() {
    let service = seeded_service();

    let report = service.roster(ScoringMode::Strict).expect("roster scores");

    let order: Vec<&str> = report
        .students
        .iter()
        .map(|summary| summary.student_id.0.as_str())
        .collect();
    assert_eq!(order, vec!["S002", "S001", "S003"]);
    assert!(report.rejected.is_empty());

    let top = &report.students[0];
    assert_eq!(top.risk.level(), RiskLevel::High);
    assert_eq!(top.risk.score(), 70);

    let improved = &report.students[1];
    assert_eq!(improved.reporting_period, 2);
    assert_eq!(improved.risk.level(), RiskLevel::Low);
}

#[test]
fn roster_sets_aside_snapshots_with_unusable_fields() {
    let service = seeded_service();
    let broken = record(70, 65, "Paid").with(fields::ATTENDANCE, 140);
    service
        .import(vec![snapshot("S004", 1, broken)])
        .expect("import succeeds");

    let report = service.roster(ScoringMode::Strict).expect("roster scores");

    assert_eq!(report.students.len(), 3);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].student_id, StudentId("S004".to_string()));
    assert!(report.rejected[0].reason.contains(fields::ATTENDANCE));
}

#[test]
fn roster_fails_when_model_is_unavailable_in_strict_mode() {
    let engine = Arc::new(RiskEngine::unavailable(
        "artifact missing",
        RuleConfig::default(),
    ));
    let service = RiskAssessmentService::new(engine, Arc::new(MemoryRepository::default()));
    service
        .import(vec![snapshot("S001", 1, record(58, 48, "Overdue"))])
        .expect("import succeeds");

    let err = service.roster(ScoringMode::Strict).unwrap_err();
    assert!(matches!(
        err,
        RiskServiceError::Scoring(ScoringError::ModelUnavailable { .. })
    ));

    let report = service
        .roster(ScoringMode::AllowRulesOnly)
        .expect("rules-only roster");
    assert_eq!(report.students[0].risk.score(), 70);
    assert!(report.students[0].risk.probabilities().is_empty());
}

#[test]
fn student_detail_scores_latest_period_and_returns_history() {
    let service = seeded_service();

    let detail = service
        .student_detail(&StudentId("S001".to_string()), ScoringMode::Strict)
        .expect("detail available");

    assert_eq!(detail.reporting_period, 2);
    assert_eq!(detail.history.len(), 2);
    assert_eq!(detail.history[0].reporting_period, 1);
    assert_eq!(detail.risk.level(), RiskLevel::Low);
    assert_eq!(detail.risk.probabilities().get("Graduate"), Some(&60));
}

#[test]
fn unknown_student_is_not_found() {
    let service = seeded_service();

    let err = service
        .student_detail(&StudentId("S404".to_string()), ScoringMode::Strict)
        .unwrap_err();

    assert!(matches!(
        err,
        RiskServiceError::Repository(RepositoryError::NotFound)
    ));
}

#[test]
fn recalculate_reports_schema_errors() {
    let service = seeded_service();
    let record = record(80, 70, "Paid");
    let mut incomplete = record.clone();
    incomplete.remove(fields::FEE_STATUS);

    let err = service
        .recalculate(&incomplete, ScoringMode::Strict)
        .unwrap_err();

    assert!(matches!(
        err,
        RiskServiceError::Scoring(ScoringError::Schema(SchemaError::MissingField { ref field }))
            if field == fields::FEE_STATUS
    ));
    assert!(service.recalculate(&record, ScoringMode::Strict).is_ok());
}

#[test]
fn duplicate_periods_are_rejected_on_import() {
    let service = seeded_service();

    let err = service
        .import(vec![snapshot("S003", 1, record(90, 90, "Paid"))])
        .unwrap_err();

    assert!(matches!(
        err,
        RiskServiceError::Repository(RepositoryError::Conflict)
    ));
}

#[test]
fn repository_outage_surfaces_as_repository_error() {
    let service = RiskAssessmentService::new(engine(), Arc::new(UnavailableRepository));

    let err = service.roster(ScoringMode::Strict).unwrap_err();

    assert!(matches!(
        err,
        RiskServiceError::Repository(RepositoryError::Unavailable(_))
    ));
}
