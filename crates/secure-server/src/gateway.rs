//! [`EncryptionGateway`]: the only entry point the HTTP layer uses.
//!
//! The gateway turns detailed key, cipher, and replay errors into the two
//! opaque [`ServiceError`] variants. The detail is emitted on the `security`
//! tracing target and nowhere else.

use std::time::SystemTime;

use common::{Payload, ServiceError};
use thiserror::Error;
use tracing::warn;

use crate::crypto::{cipher, transcode, CipherError, ReplayError, ReplayGuard};
use crate::keys::{KeyCache, KeyError, SessionCredential};

/// Specific failure reason, kept inside the gateway.
#[derive(Debug, Error)]
enum Failure {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Orchestrates key lookup, AEAD, and freshness checks for one request cycle.
#[derive(Clone, Debug, Default)]
pub struct EncryptionGateway {
    keys: KeyCache,
    guard: ReplayGuard,
}

impl EncryptionGateway {
    /// Create a gateway over an existing cache and guard.
    pub fn new(keys: KeyCache, guard: ReplayGuard) -> Self {
        Self { keys, guard }
    }

    /// The key cache shared with the rest of the process.
    pub fn keys(&self) -> &KeyCache {
        &self.keys
    }

    /// Decrypt and validate a standard-base64 body envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::DecryptionFailed`] for every failure.
    pub async fn open_body(
        &self,
        credential: &SessionCredential,
        envelope: &str,
    ) -> Result<Payload, ServiceError> {
        self.open_at(credential, envelope, SystemTime::now())
            .await
            .map_err(|e| {
                warn!(target: "security", channel = "body", reason = %e, "request decryption failed");
                ServiceError::DecryptionFailed
            })
    }

    /// Decrypt and validate a URL-safe query envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::DecryptionFailed`] for every failure.
    pub async fn open_query(
        &self,
        credential: &SessionCredential,
        encoded: &str,
    ) -> Result<Payload, ServiceError> {
        let standard = transcode::to_standard(encoded);
        self.open_at(credential, &standard, SystemTime::now())
            .await
            .map_err(|e| {
                warn!(target: "security", channel = "query", reason = %e, "request decryption failed");
                ServiceError::DecryptionFailed
            })
    }

    /// Encrypt a response payload into a standard-base64 envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::EncryptionFailed`] for every failure.
    pub async fn seal(
        &self,
        credential: &SessionCredential,
        payload: &Payload,
    ) -> Result<String, ServiceError> {
        self.seal_inner(credential, payload).await.map_err(|e| {
            warn!(target: "security", reason = %e, "response encryption failed");
            ServiceError::EncryptionFailed
        })
    }

    /// Encrypt a payload into a URL-safe envelope for an `encrypted=` query
    /// parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::EncryptionFailed`] for every failure.
    pub async fn seal_query(
        &self,
        credential: &SessionCredential,
        payload: &Payload,
    ) -> Result<String, ServiceError> {
        self.seal(credential, payload)
            .await
            .map(|envelope| transcode::to_url_safe(&envelope))
    }

    async fn open_at(
        &self,
        credential: &SessionCredential,
        envelope: &str,
        now: SystemTime,
    ) -> Result<Payload, Failure> {
        let key = self.keys.derive(credential).await?;
        let payload = cipher::decrypt_payload(envelope, key.as_bytes())?;
        self.guard.validate(&payload, now)?;
        Ok(payload)
    }

    async fn seal_inner(
        &self,
        credential: &SessionCredential,
        payload: &Payload,
    ) -> Result<String, Failure> {
        let key = self.keys.derive(credential).await?;
        Ok(cipher::encrypt_payload(payload, key.as_bytes())?)
    }
}
