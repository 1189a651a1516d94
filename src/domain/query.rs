use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Input problems the caller can fix. Messages are returned verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Request body must be a JSON object")]
    InvalidBody,
    #[error("Latitude and longitude must be valid numbers")]
    NotANumber,
    #[error("Latitude must be between -90 and 90")]
    LatitudeOutOfRange,
    #[error("Longitude must be between -180 and 180")]
    LongitudeOutOfRange,
}

fn default_min() -> f64 {
    100.0
}
fn default_max() -> f64 {
    10000.0
}
fn default_radius() -> f64 {
    2000.0
}

/// Allowed search radius band in meters
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RadiusPolicy {
    #[serde(default = "default_min")]
    pub min: f64,
    #[serde(default = "default_max")]
    pub max: f64,
    #[serde(default = "default_radius")]
    pub default: f64,
}

impl Default for RadiusPolicy {
    fn default() -> Self {
        Self {
            min: default_min(),
            max: default_max(),
            default: default_radius(),
        }
    }
}

impl RadiusPolicy {
    /// Radius to search with. Missing or out-of-band values become the default.
    pub fn resolve(&self, requested: Option<f64>) -> f64 {
        match requested {
            Some(r) if r.is_finite() && r >= self.min && r <= self.max => r,
            _ => self.default,
        }
    }
}

/// A validated nearby-venue search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

impl SearchQuery {
    /// Validate coordinates and build a query
    pub fn new(
        latitude: Option<f64>,
        longitude: Option<f64>,
        radius: Option<f64>,
        policy: &RadiusPolicy,
    ) -> Result<Self, ValidationError> {
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Err(ValidationError::NotANumber);
        };
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(ValidationError::NotANumber);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange);
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange);
        }

        Ok(Self {
            latitude,
            longitude,
            radius_m: policy.resolve(radius),
        })
    }

    /// Build a query from a request body like
    /// `{ "latitude": 45.0, "longitude": -93.0, "radius": 2000 }`.
    ///
    /// Only JSON numbers count; strings such as `"45"` are rejected for the
    /// coordinates and ignored for the radius.
    pub fn from_json(body: &Value, policy: &RadiusPolicy) -> Result<Self, ValidationError> {
        let object = body.as_object().ok_or(ValidationError::InvalidBody)?;
        let number = |key: &str| object.get(key).and_then(Value::as_f64);

        Self::new(number("latitude"), number("longitude"), number("radius"), policy)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}
