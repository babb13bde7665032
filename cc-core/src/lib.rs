//! Campus Companion Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by all other crates:
//! - Application configuration (API base URL, store location, sync limits)
//! - The unified error taxonomy for remote, local-store, and migration failures
//! - Structured logging with tracing
//! - Per-user data/config directories
//! - Common constants

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::{AppConfig, ConfigHandle};
pub use error::{CcError, CcResult};
pub use logging::init_logging;
