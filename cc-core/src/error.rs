//! Global error types for the Campus Companion client.
//!
//! Every failure category across the workspace is unified into a single
//! `CcError` enum. The remote variants drive the offline fallback, the local
//! variants always propagate, and the migration variants decide whether
//! startup may continue.

use thiserror::Error;

/// Convenience type alias for Results using CcError.
pub type CcResult<T> = Result<T, CcError>;

/// Unified error type covering all error categories.
#[derive(Error, Debug)]
pub enum CcError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // -- Remote errors --
    /// Network, DNS, or timeout failure. Never shown as a hard error on read paths.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The server answered with a well-formed error response.
    #[error("remote rejected request (status {status}): {message}")]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
        /// Error message supplied by the server.
        message: String,
    },

    /// The requested remote record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    // -- Local store errors --
    /// SQLite error on a read or schema operation.
    #[error("database error: {0}")]
    Database(String),

    /// The local store rejected a write (disk full, constraint violation).
    #[error("local write failed: {0}")]
    LocalWriteFailed(String),

    /// Database connection pool error.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Database integrity check failed.
    #[error("database integrity check failed: {0}")]
    IntegrityCheck(String),

    // -- Migration errors --
    /// The migration's change is already present. Expected and non-fatal.
    #[error("migration {0} already applied")]
    MigrationAlreadyApplied(i64),

    /// A migration failed for any other reason. Fatal at startup.
    #[error("migration {id} failed: {reason}")]
    MigrationFailed {
        /// Migration identifier (the schema version it produces).
        id: i64,
        /// Underlying cause.
        reason: String,
    },

    // -- Input errors --
    /// Caller-supplied data failed local validation before any I/O.
    #[error("invalid input: {0}")]
    Validation(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A sync run was cancelled before its write phase began.
    #[error("cancelled: {0}")]
    Cancelled(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CcError {
    /// Whether this error came from the remote side of a call.
    ///
    /// Remote failures are the only ones the fallback controller recovers from.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable(_) | Self::RemoteRejected { .. } | Self::NotFound(_)
        )
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_))
    }
}

impl From<serde_json::Error> for CcError {
    fn from(e: serde_json::Error) -> Self {
        CcError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for CcError {
    fn from(e: toml::de::Error) -> Self {
        CcError::Config(e.to_string())
    }
}
