use crate::cli::ServeArgs;
use crate::infra::{build_service, cors_layer, AppState};
use crate::routes::with_subscription_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use cheongyak::config::AppConfig;
use cheongyak::error::AppError;
use cheongyak::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
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

    let service = Arc::new(build_service(&config)?);

    let app = with_subscription_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer)
        .layer(cors_layer(&config.server))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        webdriver = %config.browser.webdriver_url,
        utc_offset_hours = config.schedule.utc_offset_hours,
        "subscription calendar service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
