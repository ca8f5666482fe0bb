use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryBackends};
use crate::routes::with_loan_request_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loan_intake::config::AppConfig;
use loan_intake::error::AppError;
use loan_intake::telemetry;
use loan_intake::workflows::loan_requests::{
    CreditVerifier, ExpirationSweep, LoanLifecycleService, LoanRequestState,
};
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

    let backends = InMemoryBackends::new();
    let ports = backends.ports();
    let loan_requests = LoanRequestState {
        lifecycle: Arc::new(LoanLifecycleService::new(ports.clone())),
        sweep: Arc::new(ExpirationSweep::new(
            ports,
            Arc::new(config.lifecycle.expiration_settings()),
        )),
        verifier: Arc::new(CreditVerifier::default()),
    };

    let app = with_loan_request_routes(loan_requests)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        expiration_days = config.lifecycle.expiration_days,
        "loan intake service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
