use serde::{Deserialize, Serialize};

/// Venue classification based on the OSM `amenity` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VenueCategory {
    Bar,
    Pub,
    Nightclub,
    #[serde(rename = "Beer Garden")]
    BeerGarden,
}

impl VenueCategory {
    /// Every category the upstream query asks for
    pub const ALL: [VenueCategory; 4] = [
        VenueCategory::Bar,
        VenueCategory::Pub,
        VenueCategory::Nightclub,
        VenueCategory::BeerGarden,
    ];

    /// Classify an amenity tag value. Unknown or missing values fall back to `Bar`.
    pub fn from_amenity_tag(tag: Option<&str>) -> VenueCategory {
        match tag {
            Some("pub") => VenueCategory::Pub,
            Some("nightclub") => VenueCategory::Nightclub,
            Some("biergarten") => VenueCategory::BeerGarden,
            _ => VenueCategory::Bar,
        }
    }

    /// The `amenity` value this category is queried by
    pub fn amenity_tag(self) -> &'static str {
        match self {
            VenueCategory::Bar => "bar",
            VenueCategory::Pub => "pub",
            VenueCategory::Nightclub => "nightclub",
            VenueCategory::BeerGarden => "biergarten",
        }
    }

    /// Display label, also used as the persisted `type` column
    pub fn label(self) -> &'static str {
        match self {
            VenueCategory::Bar => "Bar",
            VenueCategory::Pub => "Pub",
            VenueCategory::Nightclub => "Nightclub",
            VenueCategory::BeerGarden => "Beer Garden",
        }
    }

    pub fn from_label(label: &str) -> VenueCategory {
        VenueCategory::ALL
            .into_iter()
            .find(|c| c.label() == label)
            .unwrap_or(VenueCategory::Bar)
    }
}

/// A drinking establishment as stored in the cache.
///
/// Everything except the optional descriptive fields is fixed for a given
/// `osm_id`; the optionals are overwritten on every successful re-fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub osm_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub category: VenueCategory,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub opening_hours: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
}

impl Venue {
    pub fn position(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// A venue paired with its distance from the caller's point.
///
/// Distance is request-relative, so it lives here rather than on `Venue`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyVenue {
    #[serde(flatten)]
    pub venue: Venue,
    /// Meters from the query point
    pub distance: f64,
}

impl NearbyVenue {
    pub fn new(venue: Venue, origin: (f64, f64)) -> Self {
        let distance = crate::geometry::haversine_distance(origin, venue.position());
        Self { venue, distance }
    }
}

/// Sort ascending by distance
pub fn sort_by_distance(venues: &mut [NearbyVenue]) {
    venues.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}
