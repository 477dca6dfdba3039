use axum::http::{HeaderValue, Method};
use cheongyak::browser::WebDriverBrowser;
use cheongyak::config::{AppConfig, ServerConfig};
use cheongyak::error::AppError;
use cheongyak::strategy::OpenAiClient;
use cheongyak::subscriptions::SubscriptionService;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};
use tracing::warn;

pub(crate) type LiveService = SubscriptionService<WebDriverBrowser, OpenAiClient>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn build_service(config: &AppConfig) -> Result<LiveService, AppError> {
    if config.llm.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; strategy requests will return an error payload");
    }
    Ok(SubscriptionService::from_config(config)?)
}

/// `*` in the origin list opens CORS to every origin without credentials; an
/// explicit list allows credentials and mirrors the requested headers.
pub(crate) fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::POST, Method::OPTIONS]);

    if server.allows_any_origin() {
        return layer.allow_origin(Any).allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn server(origins: &[&str]) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            cors_origins: origins.iter().map(|origin| origin.to_string()).collect(),
        }
    }

    async fn preflight(server: &ServerConfig, origin: &str) -> axum::response::Response {
        Router::new()
            .route("/calendar", get(|| async { "ok" }))
            .layer(cors_layer(server))
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/calendar")
                    .header(header::ORIGIN, origin)
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response")
    }

    #[tokio::test]
    async fn explicit_origins_allow_credentials() {
        let response = preflight(&server(&["http://localhost:5173"]), "http://localhost:5173").await;

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "content-type");
    }

    #[tokio::test]
    async fn wildcard_origin_never_allows_credentials() {
        let response = preflight(&server(&["*"]), "https://example.org").await;

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .is_none());
    }

    #[test]
    fn parse_date_accepts_iso_dates_only() {
        assert_eq!(
            parse_date(" 2025-01-06 ").expect("date"),
            NaiveDate::from_ymd_opt(2025, 1, 6).expect("valid date")
        );
        assert!(parse_date("06/01/2025").is_err());
    }
}
