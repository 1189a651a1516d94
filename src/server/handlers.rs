use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{ApiError, AppState};
use crate::domain::{SearchQuery, ValidationError};
use crate::lookup::LookupResponse;
use crate::ratelimit::{RateLimitDecision, client_key};

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// POST /fetch-nearby-bars
///
/// Body: `{ "latitude": number, "longitude": number, "radius"?: number }`
pub async fn fetch_nearby_bars(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let client = client_key(&headers);
    let decision = state.limiter.as_ref().map(|limiter| limiter.check(&client));

    let mut response = match handle_lookup(&state, &client, decision, &body).await {
        Ok(found) => Json(found).into_response(),
        Err(err) => err.into_response(),
    };

    if let (Some(limiter), Some(decision)) = (&state.limiter, decision) {
        let headers = response.headers_mut();
        headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limiter.max_requests()));
        headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
        headers.insert(RATE_LIMIT_RESET, HeaderValue::from(decision.reset_in_secs()));
    }

    response
}

async fn handle_lookup(
    state: &AppState,
    client: &str,
    decision: Option<RateLimitDecision>,
    body: &[u8],
) -> Result<LookupResponse, ApiError> {
    if let Some(decision) = decision.filter(|d| !d.allowed) {
        info!(client, "Rate limit exceeded");
        return Err(ApiError::RateLimited {
            retry_after_secs: decision.reset_in_secs(),
        });
    }

    let payload: Value =
        serde_json::from_slice(body).map_err(|_| ValidationError::InvalidBody)?;
    let query = SearchQuery::from_json(&payload, &state.radius)?;

    info!(
        client,
        latitude = query.latitude,
        longitude = query.longitude,
        radius = query.radius_m,
        "Fetching bars"
    );

    let outcome = state.lookup.lookup(&query).await?;
    Ok(outcome.into_body())
}

/// OPTIONS preflight: no body, CORS headers come from the layer
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
