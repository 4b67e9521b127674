use crate::cli::ServeArgs;
use crate::infra::{preload_roster, AppState, InMemoryStudentRepository};
use crate::routes::with_risk_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use mentors_eye::config::AppConfig;
use mentors_eye::error::AppError;
use mentors_eye::scoring::RiskEngine;
use mentors_eye::students::RiskAssessmentService;
use mentors_eye::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let engine = Arc::new(RiskEngine::from_artifact_path(
        &config.scoring.artifact_path,
        config.scoring.rules.clone(),
    ));
    if !engine.is_model_loaded() {
        warn!(
            path = %config.scoring.artifact_path.display(),
            "serving without a risk model; only rules_only requests will succeed"
        );
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        model_loaded: engine.is_model_loaded(),
        model_version: engine.model_version().map(str::to_string),
    };

    let repository = Arc::new(InMemoryStudentRepository::default());
    let risk_service = Arc::new(RiskAssessmentService::new(engine, repository));

    if let Some(path) = &config.scoring.roster_csv {
        let imported = preload_roster(&risk_service, path)?;
        info!(path = %path.display(), imported, "student roster preloaded");
    }

    let app = with_risk_routes(risk_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "mentor's eye risk service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
