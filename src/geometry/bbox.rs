use geo::{Intersects, Rect, coord};

/// Meters per degree of latitude used for bounding-box approximations
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Axis-aligned latitude/longitude rectangle approximating a search circle.
///
/// The box over-includes the corners of the circle, so callers still need to
/// filter candidates by true distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Calculate bounding box from center point and radius
    ///
    /// # Arguments
    /// * `center` - (lat, lon) center point
    /// * `radius_m` - Radius in meters
    pub fn around(center: (f64, f64), radius_m: f64) -> Self {
        let (lat, lon) = center;

        // 1 degree latitude ≈ 111 km
        // 1 degree longitude ≈ 111 km * cos(lat)
        let lat_delta = radius_m / METERS_PER_DEGREE;
        let mut lon_delta = radius_m / (METERS_PER_DEGREE * lat.to_radians().cos());
        // cos(lat) -> 0 at the poles
        if !lon_delta.is_finite() || lon_delta > 180.0 {
            lon_delta = 180.0;
        }

        Self {
            south: lat - lat_delta,
            west: lon - lon_delta,
            north: lat + lat_delta,
            east: lon + lon_delta,
        }
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.west, y: self.south },
            coord! { x: self.east, y: self.north },
        )
    }

    /// Whether (lat, lon) lies inside the box, edges included
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.to_rect().intersects(&coord! { x: lon, y: lat })
    }
}
