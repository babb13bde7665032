//! Server response envelope.
//!
//! Every endpoint answers with the same JSON envelope:
//! ```json
//! { "success": true, "count": 2, "data": [ ... ] }
//! { "success": false, "error": "Item not found" }
//! ```

use serde::{Deserialize, Serialize};

use cc_core::error::{CcError, CcResult};

/// Standard server response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    /// Whether the server handled the request.
    #[serde(default)]
    pub success: bool,
    /// Response payload (type varies by endpoint).
    pub data: Option<T>,
    /// Error text on failures.
    #[serde(default)]
    pub error: Option<String>,
    /// Human-readable message on some successful writes.
    #[serde(default)]
    pub message: Option<String>,
    /// Number of rows in `data` for list endpoints.
    #[serde(default)]
    pub count: Option<i64>,
}

impl<T> ApiResponse<T> {
    /// The best available error text.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "request failed".to_string())
    }

    /// Convert into the payload, rejecting envelopes that report failure.
    pub fn into_data(self, status: u16) -> CcResult<Option<T>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(CcError::RemoteRejected {
                status,
                message: self.error_message(),
            })
        }
    }
}
