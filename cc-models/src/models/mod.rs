//! Entity model definitions.

pub mod event;
pub mod lost_found;
pub mod preferences;
pub mod schedule;
