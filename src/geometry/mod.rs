pub mod bbox;
pub mod distance;

pub use bbox::BoundingBox;
pub use distance::haversine_distance;
