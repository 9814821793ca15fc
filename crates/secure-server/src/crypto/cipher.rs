//! AES-256-GCM sealing and opening of whole JSON payloads.
//!
//! **Nonce discipline:** every call to [`encrypt_payload`] draws a fresh 96-bit
//! nonce from the OS CSPRNG. A nonce is never derived from the payload or from
//! a counter. Reusing a GCM nonce under one key breaks both confidentiality and
//! authentication.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::Payload;
use thiserror::Error;
use zeroize::Zeroizing;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the GCM authentication tag appended by the cipher.
pub const TAG_LEN: usize = 16;

/// Smallest decoded envelope worth handing to the cipher.
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN + 1;

/// Errors produced by the cipher layer.
///
/// The variants are for local diagnostics. Callers at the HTTP boundary fold
/// every opening failure into one opaque error.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    /// The envelope is not valid standard-alphabet base64.
    #[error("envelope is not valid base64")]
    Base64Decode,

    /// The decoded envelope is shorter than [`MIN_ENVELOPE_LEN`] bytes.
    #[error("envelope too short")]
    EnvelopeTooShort,

    /// Tag mismatch, wrong key, or corrupted ciphertext.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The opened plaintext is not a JSON object.
    #[error("plaintext is not a JSON object")]
    JsonParse,

    /// The payload could not be serialised to JSON.
    #[error("payload serialisation failed")]
    Serialize,

    /// The OS random source could not supply a nonce.
    #[error("nonce generation failed")]
    NonceGeneration,

    /// AES-GCM sealing failed.
    #[error("aead seal failed")]
    Seal,
}

/// Encrypt `payload` under `key` and return the standard-base64 envelope
/// `nonce || ciphertext || tag`.
///
/// # Errors
///
/// Returns [`CipherError::Serialize`], [`CipherError::NonceGeneration`], or
/// [`CipherError::Seal`]; none of these depend on attacker input.
pub fn encrypt_payload(payload: &Payload, key: &[u8; KEY_LEN]) -> Result<String, CipherError> {
    let plaintext =
        Zeroizing::new(serde_json::to_vec(payload).map_err(|_| CipherError::Serialize)?);
    seal_bytes(&plaintext, key)
}

/// Open a standard-base64 envelope and parse the plaintext as a JSON object.
///
/// # Errors
///
/// Returns [`CipherError::Base64Decode`], [`CipherError::EnvelopeTooShort`],
/// [`CipherError::AuthenticationFailed`], or [`CipherError::JsonParse`].
pub fn decrypt_payload(envelope: &str, key: &[u8; KEY_LEN]) -> Result<Payload, CipherError> {
    let raw = STANDARD
        .decode(envelope.as_bytes())
        .map_err(|_| CipherError::Base64Decode)?;
    if raw.len() < MIN_ENVELOPE_LEN {
        return Err(CipherError::EnvelopeTooShort);
    }

    let (nonce, sealed) = raw.split_at(NONCE_LEN);
    let plaintext = Zeroizing::new(
        build_cipher(key)
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::AuthenticationFailed)?,
    );

    serde_json::from_slice::<Payload>(&plaintext).map_err(|_| CipherError::JsonParse)
}

fn seal_bytes(plaintext: &[u8], key: &[u8; KEY_LEN]) -> Result<String, CipherError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut nonce_bytes)
        .map_err(|_| CipherError::NonceGeneration)?;

    let sealed = build_cipher(key)
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| CipherError::Seal)?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + sealed.len());
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&sealed);
    Ok(STANDARD.encode(envelope))
}

fn build_cipher(key: &[u8; KEY_LEN]) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn random_key() -> [u8; KEY_LEN] {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        key
    }

    fn payload(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("test payload must be an object, got {other}"),
        }
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = random_key();
        let p = payload(json!({
            "user": {"name": "alice", "roles": ["admin", "ops"]},
            "count": 3,
            "ratio": 0.5,
            "flag": true,
            "nothing": null,
            "_timestamp": 1_700_000_000_000_i64
        }));
        let envelope = encrypt_payload(&p, &key).unwrap();
        assert_eq!(decrypt_payload(&envelope, &key).unwrap(), p);
    }

    #[test]
    fn envelope_layout_is_nonce_ciphertext_tag() {
        let key = random_key();
        let p = payload(json!({"a": 1}));
        let plaintext_len = serde_json::to_vec(&p).unwrap().len();
        let envelope = encrypt_payload(&p, &key).unwrap();
        let raw = STANDARD.decode(envelope).unwrap();
        assert_eq!(raw.len(), NONCE_LEN + plaintext_len + TAG_LEN);
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let key = random_key();
        let p = payload(json!({"same": "input"}));
        let a = encrypt_payload(&p, &key).unwrap();
        let b = encrypt_payload(&p, &key).unwrap();
        assert_ne!(a, b);
        let nonce_a = &STANDARD.decode(&a).unwrap()[..NONCE_LEN];
        let nonce_b = &STANDARD.decode(&b).unwrap()[..NONCE_LEN];
        assert_ne!(nonce_a, nonce_b);
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let envelope = encrypt_payload(&payload(json!({"x": 1})), &random_key()).unwrap();
        assert_eq!(
            decrypt_payload(&envelope, &random_key()),
            Err(CipherError::AuthenticationFailed)
        );
    }

    #[test]
    fn every_single_bit_flip_is_detected() {
        let key = random_key();
        let envelope = encrypt_payload(&payload(json!({"user": "alice"})), &key).unwrap();
        let raw = STANDARD.decode(&envelope).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt_payload(&STANDARD.encode(&tampered), &key);
                assert_eq!(
                    result,
                    Err(CipherError::AuthenticationFailed),
                    "flip of byte {byte} bit {bit} went undetected"
                );
            }
        }
    }

    #[test]
    fn short_envelope_rejected_before_cipher() {
        let key = random_key();
        // 12 decoded bytes: a nonce and nothing else.
        let short = STANDARD.encode([0u8; NONCE_LEN]);
        assert_eq!(decrypt_payload(&short, &key), Err(CipherError::EnvelopeTooShort));
        assert_eq!(decrypt_payload("", &key), Err(CipherError::EnvelopeTooShort));
    }

    #[test]
    fn minimum_length_envelope_reaches_cipher() {
        let key = random_key();
        let thirteen = STANDARD.encode([0u8; MIN_ENVELOPE_LEN]);
        assert_eq!(
            decrypt_payload(&thirteen, &key),
            Err(CipherError::AuthenticationFailed)
        );
    }

    #[test]
    fn invalid_base64_rejected() {
        assert_eq!(
            decrypt_payload("not*base64!", &random_key()),
            Err(CipherError::Base64Decode)
        );
    }

    #[test]
    fn url_safe_alphabet_is_not_accepted_for_bodies() {
        assert_eq!(
            decrypt_payload("AAAA-_AAAAAAAAAAAAAAAA", &random_key()),
            Err(CipherError::Base64Decode)
        );
    }

    #[test]
    fn non_object_plaintext_is_a_parse_failure() {
        let key = random_key();
        for plaintext in [&b"[1,2,3]"[..], b"\"str\"", b"{not json"] {
            let envelope = seal_bytes(plaintext, &key).unwrap();
            assert_eq!(decrypt_payload(&envelope, &key), Err(CipherError::JsonParse));
        }
    }
}
