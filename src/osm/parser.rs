use crate::api::Element;
use crate::domain::{NearbyVenue, Venue, VenueCategory};
use std::collections::{HashMap, HashSet};

const NAME_KEYS: &[&str] = &["name"];
const AMENITY_KEYS: &[&str] = &["amenity"];
const OPENING_HOURS_KEYS: &[&str] = &["opening_hours"];
const WEBSITE_KEYS: &[&str] = &["website", "contact:website"];
const PHONE_KEYS: &[&str] = &["phone", "contact:phone", "phone:mobile"];

const FULL_ADDRESS_KEYS: &[&str] = &["addr:full"];
const HOUSE_NUMBER_KEYS: &[&str] = &["addr:housenumber"];
const STREET_KEYS: &[&str] = &["addr:street"];
const CITY_KEYS: &[&str] = &["addr:city"];
const STATE_KEYS: &[&str] = &["addr:state"];
const POSTCODE_KEYS: &[&str] = &["addr:postcode"];

/// Read-only view over an element's OSM tags
#[derive(Debug, Clone, Copy)]
pub struct Tags<'a>(Option<&'a HashMap<String, String>>);

impl<'a> Tags<'a> {
    pub fn new(tags: Option<&'a HashMap<String, String>>) -> Self {
        Self(tags)
    }

    /// First non-empty value among the candidate keys, in order
    pub fn first(&self, keys: &[&str]) -> Option<&'a str> {
        let tags = self.0?;
        keys.iter()
            .filter_map(|key| tags.get(*key))
            .map(|value| value.as_str())
            .find(|value| !value.is_empty())
    }

    fn first_owned(&self, keys: &[&str]) -> Option<String> {
        self.first(keys).map(str::to_string)
    }

    /// Postal address for display.
    ///
    /// Prefers `addr:full`, otherwise joins "housenumber street", city, state
    /// and postcode with ", ", skipping empty parts.
    pub fn address(&self) -> Option<String> {
        if let Some(full) = self.first(FULL_ADDRESS_KEYS) {
            return Some(full.to_string());
        }

        let street_line = [self.first(HOUSE_NUMBER_KEYS), self.first(STREET_KEYS)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        let parts: Vec<&str> = [
            Some(street_line.as_str()),
            self.first(CITY_KEYS),
            self.first(STATE_KEYS),
            self.first(POSTCODE_KEYS),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Resolve the element's position: nodes carry lat/lon, ways a precomputed center
fn element_position(element: &Element) -> Option<(f64, f64)> {
    match (element.lat, element.lon, element.center) {
        (Some(lat), Some(lon), _) => Some((lat, lon)),
        (_, _, Some(center)) => Some((center.lat, center.lon)),
        _ => None,
    }
}

fn is_valid_position((lat, lon): (f64, f64)) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Map one Overpass element to a venue.
///
/// Returns `None` for unnamed elements and for elements without a usable position.
pub fn normalize_element(element: &Element) -> Option<Venue> {
    let tags = Tags::new(element.tags.as_ref());
    let name = tags.first(NAME_KEYS)?;

    let (latitude, longitude) = element_position(element).filter(|p| is_valid_position(*p))?;

    Some(Venue {
        osm_id: element.id,
        name: name.to_string(),
        category: VenueCategory::from_amenity_tag(tags.first(AMENITY_KEYS)),
        latitude,
        longitude,
        address: tags.address(),
        opening_hours: tags.first_owned(OPENING_HOURS_KEYS),
        website: tags.first_owned(WEBSITE_KEYS),
        phone: tags.first_owned(PHONE_KEYS),
    })
}

/// Parse Overpass elements into venues with distances from `origin`
///
/// # Algorithm
/// 1. Normalize each element, dropping unnamed or position-less ones
/// 2. Keep the first occurrence of each OSM id
/// 3. Compute the haversine distance to `origin` (lat, lon)
pub fn parse_venues(elements: &[Element], origin: (f64, f64)) -> Vec<NearbyVenue> {
    let mut seen = HashSet::new();

    elements
        .iter()
        .filter_map(normalize_element)
        .filter(|venue| seen.insert(venue.osm_id))
        .map(|venue| NearbyVenue::new(venue, origin))
        .collect()
}
