use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{CacheError, VenueStore};
use crate::domain::Venue;
use crate::geometry::BoundingBox;

/// Process-local venue store; contents vanish on restart
#[derive(Debug, Default)]
pub struct InMemoryVenueStore {
    venues: RwLock<HashMap<i64, Venue>>,
}

impl InMemoryVenueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, osm_id: i64) -> Option<Venue> {
        self.venues.read().await.get(&osm_id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.venues.read().await.len()
    }
}

#[async_trait]
impl VenueStore for InMemoryVenueStore {
    async fn upsert(&self, venues: &[Venue]) -> Result<(), CacheError> {
        let mut stored = self.venues.write().await;
        for venue in venues {
            stored.insert(venue.osm_id, venue.clone());
        }
        Ok(())
    }

    async fn query_bounding_box(
        &self,
        center: (f64, f64),
        radius_m: f64,
    ) -> Result<Vec<Venue>, CacheError> {
        let bbox = BoundingBox::around(center, radius_m);
        let stored = self.venues.read().await;

        Ok(stored
            .values()
            .filter(|venue| bbox.contains(venue.latitude, venue.longitude))
            .cloned()
            .collect())
    }
}
