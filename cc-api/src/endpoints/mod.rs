//! API endpoint modules organized by collection.

pub mod events;
pub mod lost_found;
