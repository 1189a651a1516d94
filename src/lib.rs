//! barhop - find bars, pubs and nightclubs near a point using OpenStreetMap data

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod geometry;
pub mod lookup;
pub mod osm;
pub mod ratelimit;
pub mod server;
