//! [`SessionCredential`]: the caller identity that keys are derived from.

use common::protocol::BEARER_PREFIX;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::store::KeyError;

/// Cache index for a credential: SHA-256 over the length-prefixed pair.
pub(crate) type CredentialId = [u8; 32];

/// Bearer token plus session identifier, both non-empty.
///
/// Construction is the only validation point, so every value of this type is
/// well-formed and key derivation from it cannot be handed a blank half.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionCredential {
    token: String,
    session_id: String,
}

impl SessionCredential {
    /// Build a credential from a raw token and session id.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidCredential`] if either part is empty.
    pub fn new(token: impl Into<String>, session_id: impl Into<String>) -> Result<Self, KeyError> {
        let token = token.into();
        let session_id = session_id.into();
        if token.is_empty() || session_id.is_empty() {
            return Err(KeyError::InvalidCredential);
        }
        Ok(Self { token, session_id })
    }

    /// Build a credential from an `Authorization` header value and a session id.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::InvalidCredential`] if the header does not use the
    /// `Bearer` scheme or either part is empty.
    pub fn from_authorization(authorization: &str, session_id: &str) -> Result<Self, KeyError> {
        let token = authorization
            .strip_prefix(BEARER_PREFIX)
            .ok_or(KeyError::InvalidCredential)?;
        Self::new(token, session_id)
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    pub(crate) fn session_id(&self) -> &str {
        &self.session_id
    }

    pub(crate) fn cache_id(&self) -> CredentialId {
        let mut hasher = Sha256::new();
        hasher.update((self.token.len() as u64).to_be_bytes());
        hasher.update(self.token.as_bytes());
        hasher.update(self.session_id.as_bytes());
        hasher.finalize().into()
    }
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionCredential([REDACTED])")
    }
}
