//! Integration tests for the lookup endpoint
//!
//! Tests cover:
//! - Live lookups and response shape
//! - Validation errors (400)
//! - Rate limiting (429, limit headers)
//! - Cache fallback when Overpass is down
//! - Generic 500 when both sources fail
//! - CORS preflight and health

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use barhop::api::{Element, PoiSource, UpstreamError};
use barhop::cache::{CacheError, InMemoryVenueStore, VenueStore};
use barhop::domain::{RadiusPolicy, Venue, VenueCategory};
use barhop::lookup::LookupService;
use barhop::ratelimit::{RateLimitConfig, RateLimiter};
use barhop::server::{AppState, build_router};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

struct FakeOverpass(Vec<Element>);

#[async_trait]
impl PoiSource for FakeOverpass {
    async fn query_pois(&self, _: (f64, f64), _: f64) -> Result<Vec<Element>, UpstreamError> {
        Ok(self.0.clone())
    }
}

struct OverpassDown;

#[async_trait]
impl PoiSource for OverpassDown {
    async fn query_pois(&self, _: (f64, f64), _: f64) -> Result<Vec<Element>, UpstreamError> {
        Err(UpstreamError::Status(reqwest::StatusCode::BAD_GATEWAY))
    }
}

struct DatabaseDown;

#[async_trait]
impl VenueStore for DatabaseDown {
    async fn upsert(&self, _: &[Venue]) -> Result<(), CacheError> {
        Err(CacheError::Upsert(sqlx::Error::PoolTimedOut))
    }

    async fn query_bounding_box(&self, _: (f64, f64), _: f64) -> Result<Vec<Venue>, CacheError> {
        Err(CacheError::Query(sqlx::Error::PoolTimedOut))
    }
}

fn bar(id: i64, lat: f64, lon: f64, name: &str, amenity: &str) -> Element {
    Element {
        type_: "node".to_string(),
        id,
        lat: Some(lat),
        lon: Some(lon),
        center: None,
        tags: Some(HashMap::from([
            ("name".to_string(), name.to_string()),
            ("amenity".to_string(), amenity.to_string()),
            ("addr:housenumber".to_string(), "12".to_string()),
            ("addr:street".to_string(), "Main St".to_string()),
            ("addr:city".to_string(), "Springfield".to_string()),
        ])),
    }
}

fn cached_venue(osm_id: i64, lat: f64, lon: f64) -> Venue {
    Venue {
        osm_id,
        name: format!("Cached {osm_id}"),
        category: VenueCategory::Pub,
        latitude: lat,
        longitude: lon,
        address: None,
        opening_hours: None,
        website: None,
        phone: Some("+1 555 0100".to_string()),
    }
}

/// Test helper: Create app with the given sources and a 10-per-minute limit
fn setup_app(source: impl PoiSource + 'static, store: Arc<dyn VenueStore>) -> axum::Router {
    let lookup = LookupService::new(Arc::new(source), store);
    let limiter = RateLimiter::new(&RateLimitConfig::default());
    build_router(AppState::new(lookup, Some(limiter), RadiusPolicy::default()))
}

fn live_app() -> axum::Router {
    setup_app(
        FakeOverpass(vec![
            bar(1, 45.01, -93.0, "Far Pub", "pub"),
            bar(2, 45.001, -93.0, "Corner Garden", "biergarten"),
        ]),
        Arc::new(InMemoryVenueStore::new()),
    )
}

fn lookup_request(body: Value, client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/fetch-nearby-bars")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Live lookups
// =============================================================================

#[tokio::test]
async fn test_live_lookup_response() {
    let app = live_app();

    let request = lookup_request(json!({ "latitude": 45.0, "longitude": -93.0 }), "1.1.1.1");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "10");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "9");
    assert_eq!(response.headers()["x-ratelimit-reset"], "60");
    assert_eq!(response.headers()["access-control-allow-origin"], "*");

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["fromCache"], false);

    let first = &body["bars"][0];
    assert_eq!(first["osm_id"], 2);
    assert_eq!(first["name"], "Corner Garden");
    assert_eq!(first["type"], "Beer Garden");
    assert_eq!(first["address"], "12 Main St, Springfield");
    assert!(first["website"].is_null());
    assert!(first["distance"].as_f64().unwrap() < body["bars"][1]["distance"].as_f64().unwrap());
}

#[tokio::test]
async fn test_live_lookup_populates_cache() {
    let store = Arc::new(InMemoryVenueStore::new());
    let app = setup_app(
        FakeOverpass(vec![bar(5, 45.0, -93.0, "Local", "bar")]),
        store.clone(),
    );

    let request = lookup_request(json!({ "latitude": 45.0, "longitude": -93.0 }), "1.1.1.1");
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = store.get(5).await.expect("venue should be cached");
    assert_eq!(stored.name, "Local");
    assert_eq!(stored.address.as_deref(), Some("12 Main St, Springfield"));
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_latitude_out_of_range() {
    let app = live_app();

    let request = lookup_request(json!({ "latitude": 91, "longitude": 0 }), "2.2.2.2");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "9");
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Latitude must be between -90 and 90");
}

#[tokio::test]
async fn test_longitude_out_of_range() {
    let app = live_app();

    let request = lookup_request(json!({ "latitude": 0, "longitude": -200 }), "2.2.2.2");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Longitude must be between -180 and 180");
}

#[tokio::test]
async fn test_non_numeric_coordinates() {
    let app = live_app();

    let request = lookup_request(json!({ "latitude": "45", "longitude": -93 }), "2.2.2.2");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Latitude and longitude must be valid numbers");
}

#[tokio::test]
async fn test_malformed_body() {
    let app = live_app();

    let request = Request::builder()
        .method("POST")
        .uri("/fetch-nearby-bars")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn test_eleventh_request_is_rate_limited() {
    let app = live_app();
    let body = json!({ "latitude": 45.0, "longitude": -93.0 });

    for i in 0..10 {
        let response = app
            .clone()
            .oneshot(lookup_request(body.clone(), "203.0.113.9, 10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {} should pass", i + 1);
    }

    let response = app
        .clone()
        .oneshot(lookup_request(body.clone(), "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Too many requests. Please try again later.");

    // A different client is unaffected
    let response = app
        .oneshot(lookup_request(json!({ "latitude": 45.0, "longitude": -93.0 }), "198.51.100.1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_disabled_omits_headers() {
    let lookup = LookupService::new(
        Arc::new(FakeOverpass(Vec::new())),
        Arc::new(InMemoryVenueStore::new()),
    );
    let app = build_router(AppState::new(lookup, None, RadiusPolicy::default()));

    let request = lookup_request(json!({ "latitude": 45.0, "longitude": -93.0 }), "1.1.1.1");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-ratelimit-limit").is_none());
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["bars"], json!([]));
}

// =============================================================================
// Cache fallback
// =============================================================================

#[tokio::test]
async fn test_fallback_to_cache() {
    let store = Arc::new(InMemoryVenueStore::new());
    store
        .upsert(&[
            cached_venue(1, 45.01, -93.0),
            cached_venue(2, 45.002, -93.0),
            cached_venue(3, 45.03, -93.0),
        ])
        .await
        .unwrap();
    let app = setup_app(OverpassDown, store);

    let request = lookup_request(
        json!({ "latitude": 45.0, "longitude": -93.0, "radius": 2000 }),
        "3.3.3.3",
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["fromCache"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["bars"][0]["osm_id"], 2);
    assert_eq!(body["bars"][1]["osm_id"], 1);
    assert_eq!(body["bars"][0]["phone"], "+1 555 0100");
}

#[tokio::test]
async fn test_both_sources_down_is_generic_500() {
    let app = setup_app(OverpassDown, Arc::new(DatabaseDown));

    let request = lookup_request(json!({ "latitude": 45.0, "longitude": -93.0 }), "4.4.4.4");
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get("x-ratelimit-limit").is_some());
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Unable to fetch nearby bars. Please try again later.");
    assert!(!body.to_string().contains("pool timed out"));
}

// =============================================================================
// CORS and health
// =============================================================================

#[tokio::test]
async fn test_cors_preflight() {
    let app = live_app();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/fetch-nearby-bars")
        .header("origin", "https://example.com")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert!(response.headers().get("x-ratelimit-limit").is_none());

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = live_app();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "barhop");
}
