//! Durable venue cache used as a fallback when Overpass is unavailable.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Venue;

pub use memory::InMemoryVenueStore;
pub use sqlite::SqliteVenueStore;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to open venue cache: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("failed to prepare venue cache schema: {0}")]
    Migrate(#[source] sqlx::Error),
    #[error("failed to store venues: {0}")]
    Upsert(#[source] sqlx::Error),
    #[error("failed to query cached venues: {0}")]
    Query(#[source] sqlx::Error),
}

/// Storage for venues seen in earlier upstream responses
#[async_trait]
pub trait VenueStore: Send + Sync {
    /// Insert or overwrite venues keyed by `osm_id` (last write wins)
    async fn upsert(&self, venues: &[Venue]) -> Result<(), CacheError>;

    /// All stored venues inside the bounding box around `center` (lat, lon).
    ///
    /// The box over-includes its corners; callers filter by true distance.
    async fn query_bounding_box(
        &self,
        center: (f64, f64),
        radius_m: f64,
    ) -> Result<Vec<Venue>, CacheError>;
}
