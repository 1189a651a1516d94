//! Nearby-venue lookup: live Overpass query with a cache fallback.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::PoiSource;
use crate::cache::{CacheError, VenueStore};
use crate::domain::{NearbyVenue, SearchQuery, Venue, sort_by_distance};
use crate::osm::parse_venues;

/// Both the live source and the cache failed
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("upstream unavailable and cache fallback failed: {0}")]
    CacheFallback(#[from] CacheError),
}

/// Where a lookup's venues came from
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Live(Vec<NearbyVenue>),
    Cached(Vec<NearbyVenue>),
}

impl LookupOutcome {
    pub fn venues(&self) -> &[NearbyVenue] {
        match self {
            LookupOutcome::Live(venues) | LookupOutcome::Cached(venues) => venues,
        }
    }

    pub fn from_cache(&self) -> bool {
        matches!(self, LookupOutcome::Cached(_))
    }

    pub fn into_body(self) -> LookupResponse {
        let from_cache = self.from_cache();
        let bars = match self {
            LookupOutcome::Live(venues) | LookupOutcome::Cached(venues) => venues,
        };

        LookupResponse {
            count: bars.len(),
            bars,
            from_cache,
        }
    }
}

/// Body of a successful lookup
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub bars: Vec<NearbyVenue>,
    pub count: usize,
    #[serde(rename = "fromCache")]
    pub from_cache: bool,
}

pub struct LookupService {
    source: Arc<dyn PoiSource>,
    store: Arc<dyn VenueStore>,
}

impl LookupService {
    pub fn new(source: Arc<dyn PoiSource>, store: Arc<dyn VenueStore>) -> Self {
        Self { source, store }
    }

    /// Find venues around a validated query, nearest first.
    ///
    /// Any upstream failure switches to the cache; only a failing cache
    /// query surfaces as an error.
    pub async fn lookup(&self, query: &SearchQuery) -> Result<LookupOutcome, LookupError> {
        match self.source.query_pois(query.center(), query.radius_m).await {
            Ok(elements) => {
                let venues = parse_venues(&elements, query.center());
                info!(count = venues.len(), "Found venues from OpenStreetMap");
                self.persist(&venues).await;
                Ok(LookupOutcome::Live(sorted(venues)))
            }
            Err(err) => {
                warn!(error = %err, "Overpass API failed, falling back to venue cache");
                let venues = self.fallback(query).await?;
                Ok(LookupOutcome::Cached(venues))
            }
        }
    }

    /// Best-effort cache write; failures are logged and dropped
    async fn persist(&self, venues: &[NearbyVenue]) {
        if venues.is_empty() {
            return;
        }

        let to_store: Vec<Venue> = venues.iter().map(|v| v.venue.clone()).collect();
        match self.store.upsert(&to_store).await {
            Ok(()) => info!(count = to_store.len(), "Stored/updated venues in cache"),
            Err(err) => error!(error = %err, "Failed to store venues in cache"),
        }
    }

    async fn fallback(&self, query: &SearchQuery) -> Result<Vec<NearbyVenue>, CacheError> {
        let cached = self
            .store
            .query_bounding_box(query.center(), query.radius_m)
            .await
            .inspect_err(|err| error!(error = %err, "Venue cache fallback failed"))?;
        info!(count = cached.len(), "Found venues in cache bounding box");

        let venues = cached
            .into_iter()
            .map(|venue| NearbyVenue::new(venue, query.center()))
            .filter(|nearby| nearby.distance <= query.radius_m)
            .collect();

        Ok(sorted(venues))
    }
}

fn sorted(mut venues: Vec<NearbyVenue>) -> Vec<NearbyVenue> {
    sort_by_distance(&mut venues);
    venues
}
