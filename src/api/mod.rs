pub mod overpass;

use async_trait::async_trait;

pub use overpass::{Element, OverpassClient, OverpassResponse, UpstreamError};

/// A provider of raw POI records around a point
#[async_trait]
pub trait PoiSource: Send + Sync {
    /// Fetch every drinking venue within `radius_m` meters of `center` (lat, lon)
    async fn query_pois(
        &self,
        center: (f64, f64),
        radius_m: f64,
    ) -> Result<Vec<Element>, UpstreamError>;
}
