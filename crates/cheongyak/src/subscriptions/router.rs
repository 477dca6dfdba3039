use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::service::SubscriptionService;
use crate::browser::Browser;
use crate::feed::CALENDAR_CONTENT_TYPE;
use crate::notices::UserProfile;
use crate::scrape::SourceFailure;
use crate::strategy::{CompletionClient, StrategyFailure};

/// Lists the sources that failed while answering the request.
pub const DEGRADED_SOURCES_HEADER: &str = "x-degraded-sources";

/// Router exposing the weekly calendar feed and the recommendation endpoint.
pub fn subscription_router<B, C>(service: Arc<SubscriptionService<B, C>>) -> Router
where
    B: Browser + 'static,
    C: CompletionClient + 'static,
{
    Router::new()
        .route("/calendar", get(calendar_handler::<B, C>))
        .route("/api/strategy", post(strategy_handler::<B, C>))
        .with_state(service)
}

pub(crate) async fn calendar_handler<B, C>(
    State(service): State<Arc<SubscriptionService<B, C>>>,
) -> Response
where
    B: Browser + 'static,
    C: CompletionClient + 'static,
{
    let (body, weekly) = service.calendar().await;

    let mut headers = degraded_headers(&weekly.failures);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(CALENDAR_CONTENT_TYPE),
    );
    (StatusCode::OK, headers, body).into_response()
}

/// Failures are reported in the body with status 200 so clients can show them.
pub(crate) async fn strategy_handler<B, C>(
    State(service): State<Arc<SubscriptionService<B, C>>>,
    Json(profile): Json<UserProfile>,
) -> Response
where
    B: Browser + 'static,
    C: CompletionClient + 'static,
{
    let outcome = service.strategy(&profile).await;
    let headers = degraded_headers(&outcome.failures);

    match outcome.result {
        Ok(recommendation) => (StatusCode::OK, headers, Json(recommendation)).into_response(),
        Err(error) => {
            tracing::warn!(error = %error, "strategy request failed");
            let payload = StrategyFailure::from(&error);
            (StatusCode::OK, headers, Json(payload)).into_response()
        }
    }
}

fn degraded_headers(failures: &[SourceFailure]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if failures.is_empty() {
        return headers;
    }

    let sources = failures
        .iter()
        .map(|failure| failure.source)
        .collect::<Vec<_>>()
        .join(",");
    if let Ok(value) = HeaderValue::from_str(&sources) {
        headers.insert(DEGRADED_SOURCES_HEADER, value);
    }
    headers
}
