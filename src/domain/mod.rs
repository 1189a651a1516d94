pub mod query;
pub mod venue;

pub use query::{RadiusPolicy, SearchQuery, ValidationError};
pub use venue::{NearbyVenue, Venue, VenueCategory, sort_by_distance};
