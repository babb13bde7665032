//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "CampusCompanion";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default remote API base URL.
pub const DEFAULT_API_BASE_URL: &str =
    "https://cmuq-campus-companion-app-production.up.railway.app/api";

/// Default remote API timeout in milliseconds.
pub const DEFAULT_API_TIMEOUT_MS: u64 = 15_000;

/// Default connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Number of events pulled per event sync.
pub const DEFAULT_EVENTS_SYNC_LIMIT: u32 = 100;

/// Number of lost & found postings pulled per sync.
pub const DEFAULT_LOST_FOUND_SYNC_LIMIT: u32 = 200;

/// Days a lost & found posting stays active when no expiry is given.
pub const LOST_FOUND_DEFAULT_TTL_DAYS: i64 = 30;

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "campus_companion.db";

/// Preference keys written by the UI layer.
pub mod pref_keys {
    /// Selected theme: "light", "dark", or "system".
    pub const THEME: &str = "theme_preference";

    /// Reserved key holding the applied schema version.
    pub const SCHEMA_VERSION: &str = "__schema_version";

    /// Keys that belong to the store itself and are hidden from preference listings.
    pub const RESERVED: &[&str] = &[SCHEMA_VERSION];

    /// Whether a key is reserved for internal bookkeeping.
    pub fn is_reserved(key: &str) -> bool {
        RESERVED.contains(&key)
    }
}

/// Event category names produced by the ingestion pipeline.
///
/// Categories are free-form; these are only the ones the UI colors specially.
pub mod categories {
    pub const ACADEMIC: &str = "Academic";
    pub const STUDENT_LIFE: &str = "Student Life";
    pub const SPORTS: &str = "Sports";
    pub const OTHER: &str = "Other";

    /// Categories enforced by the first store release.
    pub const LEGACY: &[&str] = &[ACADEMIC, STUDENT_LIFE, SPORTS, OTHER];
}
