use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::allocation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fund_allocation::config::AppConfig;
use fund_allocation::error::AppError;
use fund_allocation::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        allocation: Arc::new(config.allocation.clone()),
    };

    let app = allocation_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        total_funding = config.allocation.funding.available_for_allocation,
        "fund allocation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
