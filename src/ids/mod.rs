//! Marker ID specification parsing

mod grammar;
pub mod lexer;
pub mod set;

pub use grammar::parse_ids;
pub use set::{MarkerId, MarkerIdSet, MAX_MARKER_ID};
