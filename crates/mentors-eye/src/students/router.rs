use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::StudentId;
use super::repository::{RepositoryError, StudentRepository};
use super::service::{RejectedSnapshot, RiskAssessmentService, RiskServiceError, StudentRiskSummary};
use crate::scoring::{ScoringError, ScoringMode, StudentRecord};

/// `?rules_only=true` opts into rule-only verdicts while the model is down.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScoringQuery {
    #[serde(default)]
    pub(crate) rules_only: bool,
}

impl ScoringQuery {
    fn mode(&self) -> ScoringMode {
        if self.rules_only {
            ScoringMode::AllowRulesOnly
        } else {
            ScoringMode::Strict
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RosterResponse {
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) students: Vec<StudentRiskSummary>,
    pub(crate) rejected: Vec<RejectedSnapshot>,
}

/// Router exposing ad-hoc scoring and the student roster.
pub fn risk_router<R>(service: Arc<RiskAssessmentService<R>>) -> Router
where
    R: StudentRepository + 'static,
{
    Router::new()
        .route("/api/v1/risk/score", post(score_handler::<R>))
        .route("/api/v1/students", get(roster_handler::<R>))
        .route(
            "/api/v1/students/:student_id",
            get(student_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn score_handler<R>(
    State(service): State<Arc<RiskAssessmentService<R>>>,
    Query(query): Query<ScoringQuery>,
    axum::Json(record): axum::Json<StudentRecord>,
) -> Response
where
    R: StudentRepository + 'static,
{
    match service.recalculate(&record, query.mode()) {
        Ok(verdict) => (StatusCode::OK, axum::Json(verdict)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn roster_handler<R>(
    State(service): State<Arc<RiskAssessmentService<R>>>,
    Query(query): Query<ScoringQuery>,
) -> Response
where
    R: StudentRepository + 'static,
{
    match service.roster(query.mode()) {
        Ok(report) => {
            let payload = RosterResponse {
                generated_at: Utc::now(),
                students: report.students,
                rejected: report.rejected,
            };
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn student_handler<R>(
    State(service): State<Arc<RiskAssessmentService<R>>>,
    Path(student_id): Path<String>,
    Query(query): Query<ScoringQuery>,
) -> Response
where
    R: StudentRepository + 'static,
{
    let id = StudentId(student_id);
    match service.student_detail(&id, query.mode()) {
        Ok(detail) => (StatusCode::OK, axum::Json(detail)).into_response(),
        Err(RiskServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({
                "student_id": id.0,
                "error": "student not found",
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_status(err: &RiskServiceError) -> StatusCode {
    match err {
        RiskServiceError::Scoring(ScoringError::Schema(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        RiskServiceError::Scoring(ScoringError::ModelUnavailable { .. }) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        RiskServiceError::Scoring(ScoringError::ManifestMismatch { .. }) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        RiskServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        RiskServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        RiskServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: RiskServiceError) -> Response {
    let status = error_status(&err);
    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
