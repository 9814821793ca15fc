//! Shared application state injected into every Axum handler.

use crate::gateway::EncryptionGateway;

use super::middleware::DEFAULT_MAX_BODY_BYTES;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-backed or `Copy`) so that Axum can
/// clone the state for each request without copying the key cache.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Key cache, codec, and replay guard behind one opaque interface.
    pub gateway: EncryptionGateway,
    /// Upper bound on bodies the encryption middleware buffers.
    pub max_body_bytes: usize,
}

impl AppState {
    /// Create a new [`AppState`] from a gateway and body limit.
    pub fn new(gateway: EncryptionGateway, max_body_bytes: usize) -> Self {
        Self {
            gateway,
            max_body_bytes,
        }
    }
}

impl Default for AppState {
    /// Creates a default [`AppState`] with an empty key cache, suitable for tests.
    fn default() -> Self {
        Self::new(EncryptionGateway::default(), DEFAULT_MAX_BODY_BYTES)
    }
}
