use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_intake_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use kyc_onboarding::config::AppConfig;
use kyc_onboarding::error::AppError;
use kyc_onboarding::intake::{FsUploadStore, IntakeService};
use kyc_onboarding::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(FsUploadStore::from_config(&config.intake));
    let intake_service = Arc::new(IntakeService::new(store, &config.intake));

    let app = with_intake_routes(intake_service, config.intake.max_upload_bytes)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        uploads = %config.intake.uploads_dir.display(),
        audit_log = %config.intake.audit_log.display(),
        simulate_latency = config.intake.simulate_latency,
        "kyc intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
