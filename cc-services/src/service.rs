//! Service lifecycle.
//!
//! The sync engine and the connectivity controller are created against an
//! open store, initialized by the binary, and report a serializable status
//! snapshot for `campus status`.

use serde::Serialize;

use cc_core::error::CcResult;

/// Lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Constructed, `init` not yet called.
    Created,
    /// Ready to serve requests.
    Running,
    /// Shut down; further calls are a caller bug.
    Stopped,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a service for status output.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub state: ServiceState,
    pub healthy: bool,
}

/// Implemented by the long-lived services in this crate.
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    fn state(&self) -> ServiceState;

    /// Called once, after the store is open.
    fn init(&mut self) -> CcResult<()>;

    fn shutdown(&mut self) -> CcResult<()>;

    /// Running and able to serve. Services may narrow this.
    fn is_healthy(&self) -> bool {
        self.state() == ServiceState::Running
    }

    fn status(&self) -> ServiceStatus {
        ServiceStatus {
            name: self.name().to_string(),
            state: self.state(),
            healthy: self.is_healthy(),
        }
    }
}
