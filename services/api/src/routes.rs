use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use cheongyak::browser::Browser;
use cheongyak::strategy::CompletionClient;
use cheongyak::subscriptions::{subscription_router, SubscriptionService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_subscription_routes<B, C>(
    service: Arc<SubscriptionService<B, C>>,
) -> axum::Router
where
    B: Browser + 'static,
    C: CompletionClient + 'static,
{
    subscription_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use cheongyak::browser::FixtureBrowser;
    use cheongyak::config::LlmConfig;
    use cheongyak::notices::WeekClock;
    use cheongyak::scrape::{ApplyhomeCalendar, MyhomeListing, NoticeSource};
    use cheongyak::strategy::{OpenAiClient, StrategyComposer};
    use chrono::NaiveDate;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tower::ServiceExt;

    fn keyless_client() -> OpenAiClient {
        OpenAiClient::from_config(&LlmConfig {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            model: "gpt-5-mini".to_string(),
            fallback_model: "gpt-5-nano".to_string(),
            timeout: Duration::from_secs(1),
        })
        .expect("client builds")
    }

    fn offline_app(ready: bool) -> axum::Router {
        let sources: Vec<Box<dyn NoticeSource>> = vec![
            Box::new(ApplyhomeCalendar::default().with_settle(Duration::ZERO)),
            Box::new(MyhomeListing::default().with_settle(Duration::ZERO)),
        ];
        let service = Arc::new(SubscriptionService::new(
            Arc::new(FixtureBrowser::unavailable()),
            sources,
            WeekClock::pinned(NaiveDate::from_ymd_opt(2025, 1, 8).expect("valid date")),
            StrategyComposer::new(keyless_client()),
        ));
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_subscription_routes(service).layer(Extension(state))
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf-8")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = offline_app(true)
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let response = offline_app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = offline_app(true)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn calendar_without_a_browser_is_empty_and_degraded() {
        let response = offline_app(true)
            .oneshot(Request::get("/calendar").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["x-degraded-sources"],
            "applyhome,myhome"
        );
        let body = body_string(response).await;
        assert!(body.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(!body.contains("BEGIN:VEVENT"));
    }

    #[tokio::test]
    async fn strategy_without_api_key_returns_error_payload() {
        let response = offline_app(true)
            .oneshot(
                Request::post("/api/strategy")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "isHomeless": true,
                            "isMarried": false,
                            "marriageYears": 0,
                            "childrenCount": 0,
                            "isHouseholder": true,
                            "hasAccount": true,
                            "hasHouseHistory": false
                        })
                        .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).expect("json");
        assert_eq!(
            body["error"],
            "OpenAI 호출 실패: OPENAI_API_KEY is not configured"
        );
    }
}
