use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::ValidationError;
use crate::lookup::LookupError;

const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again later.";
const SERVICE_ERROR_MESSAGE: &str = "Unable to fetch nearby bars. Please try again later.";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Errors as seen by HTTP callers.
///
/// Only validation and throttling carry specific messages; everything else
/// collapses to one generic message.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    RateLimited { retry_after_secs: u64 },
    Service,
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<LookupError> for ApiError {
    fn from(_: LookupError) -> Self {
        ApiError::Service
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_MESSAGE.to_string())
            }
            ApiError::Service => (
                StatusCode::INTERNAL_SERVER_ERROR,
                SERVICE_ERROR_MESSAGE.to_string(),
            ),
        };

        let mut response = (status, Json(ErrorBody { error: message })).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}
