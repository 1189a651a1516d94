pub mod parser;

pub use parser::{Tags, normalize_element, parse_venues};
