use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use mentors_eye::students::{risk_router, RiskAssessmentService, StudentRepository};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_risk_routes<R>(service: Arc<RiskAssessmentService<R>>) -> axum::Router
where
    R: StudentRepository + 'static,
{
    risk_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready only once the listener is bound and the model bundle loaded; a
/// rules-only deployment keeps answering but reports itself degraded.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let listening = state.readiness.load(std::sync::atomic::Ordering::Acquire);

    let (status, payload) = match (listening, state.model_loaded) {
        (false, _) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "initializing" }),
        ),
        (true, false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "degraded", "model": "unavailable" }),
        ),
        (true, true) => (
            StatusCode::OK,
            json!({ "status": "ready", "model_version": state.model_version }),
        ),
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
