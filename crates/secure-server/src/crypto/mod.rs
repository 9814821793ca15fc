//! Payload encryption primitives.
//!
//! This module is intentionally free of HTTP and key-cache dependencies. Keys
//! arrive as plain `[u8; KEY_LEN]` references.
//!
//! # Envelope format
//!
//! ```text
//! base64( nonce[12] || ciphertext || tag[16] )
//! ```
//!
//! Bodies use the standard alphabet; query strings use the URL-safe unpadded
//! alphabet produced by [`transcode::to_url_safe`].

pub mod cipher;
pub mod replay;
pub mod transcode;

pub use cipher::{CipherError, KEY_LEN};
pub use replay::{ReplayError, ReplayGuard};
