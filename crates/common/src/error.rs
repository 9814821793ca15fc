//! Error taxonomy at the HTTP trust boundary.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::DecryptionFailed`] → 400
/// - [`ServiceError::EncryptionFailed`] → 500
/// - [`ServiceError::Internal`] → 500
///
/// The two cryptographic variants carry no payload. Whatever caused them is
/// reported on the diagnostic log channel only, so callers cannot tell a bad
/// tag from a stale timestamp.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request was malformed in a way unrelated to encryption.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// An encrypted request failed decoding, authentication, parsing, or
    /// freshness validation.
    #[error("request security check failed")]
    DecryptionFailed,

    /// The response envelope could not be produced.
    #[error("response encryption failed")]
    EncryptionFailed,

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::DecryptionFailed => 400,
            ServiceError::EncryptionFailed => 500,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for the error body.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::DecryptionFailed => "security_check_failed",
            ServiceError::EncryptionFailed | ServiceError::Internal(_) => "internal_error",
        }
    }

    /// Message that is safe to put in a response body.
    ///
    /// `Internal` details are replaced with a fixed string; they are meant for
    /// logs.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::BadRequest(msg) => msg.clone(),
            ServiceError::DecryptionFailed => "invalid request: data security check failed".into(),
            ServiceError::EncryptionFailed | ServiceError::Internal(_) => {
                "internal server error".into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::DecryptionFailed.http_status(), 400);
        assert_eq!(ServiceError::EncryptionFailed.http_status(), 500);
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::BadRequest("encrypted query parameter expected".into());
        assert!(e.to_string().contains("encrypted query parameter expected"));
    }

    #[test]
    fn internal_detail_is_not_public() {
        let e = ServiceError::Internal("lock poisoned at cache.rs".into());
        assert!(!e.public_message().contains("cache.rs"));
        assert_eq!(e.code(), "internal_error");
    }

    #[test]
    fn encryption_failure_looks_like_internal_error() {
        assert_eq!(
            ServiceError::EncryptionFailed.public_message(),
            ServiceError::Internal("x".into()).public_message()
        );
    }
}
