//! Wire constants and JSON types exchanged between the server and its clients.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

// ---------------------------------------------------------------------------
// Wire constants
// ---------------------------------------------------------------------------

/// Header carrying the session identifier half of the credential.
pub const HEADER_SESSION_ID: &str = "x-session-id";

/// Header flag: `true` on a request means the body is an envelope; on a
/// response it means the body was encrypted.
pub const HEADER_ENCRYPTED: &str = "x-encrypted";

/// Query parameter carrying a URL-safe envelope.
pub const QUERY_ENCRYPTED: &str = "encrypted";

/// Scheme prefix expected in the `Authorization` header.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Content type of an encrypted response body.
pub const ENCRYPTED_CONTENT_TYPE: &str = "text/plain";

/// Plaintext field holding the client's epoch-millisecond send time.
pub const TIMESTAMP_FIELD: &str = "_timestamp";

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// A decrypted request or plaintext response: a JSON object with string keys.
///
/// Key order is preserved so a payload serialises back exactly as it arrived.
pub type Payload = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        Self::new(err.code(), err.public_message())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status, always `"ok"` while the process serves.
    pub status: String,
    /// Number of session keys currently cached.
    pub cached_keys: usize,
}
