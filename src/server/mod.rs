//! HTTP surface: routes, CORS, rate-limit headers and error mapping.

mod error;
mod handlers;

use axum::Router;
use axum::http::{HeaderName, Method, header};
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domain::RadiusPolicy;
use crate::lookup::LookupService;
use crate::ratelimit::RateLimiter;

pub use error::ApiError;
pub use handlers::HealthResponse;

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub lookup: Arc<LookupService>,
    /// `None` when rate limiting is disabled
    pub limiter: Option<Arc<RateLimiter>>,
    pub radius: RadiusPolicy,
}

impl AppState {
    pub fn new(lookup: LookupService, limiter: Option<RateLimiter>, radius: RadiusPolicy) -> Self {
        Self {
            lookup: Arc::new(lookup),
            limiter: limiter.map(Arc::new),
            radius,
        }
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            post(handlers::fetch_nearby_bars).options(handlers::preflight),
        )
        .route(
            "/fetch-nearby-bars",
            post(handlers::fetch_nearby_bars).options(handlers::preflight),
        )
        .route("/health", get(handlers::health_check))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
