//! [`KeyCache`]: bounded, time-limited cache of credential-derived keys.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::credential::{CredentialId, SessionCredential};
use crate::crypto::KEY_LEN;

/// Default maximum number of cached keys.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default lifetime of a cached key, measured from derivation.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Errors produced by the key layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    /// Token or session id missing, empty, or not in `Bearer` form.
    #[error("bearer token and session id are both required")]
    InvalidCredential,

    /// HKDF refused the requested output length.
    #[error("key derivation failed")]
    Derivation,
}

/// A 256-bit key derived from a [`SessionCredential`].
///
/// Immutable once created. The bytes are zeroed when the last reference drops.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material, not even in debug builds.
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// HKDF-SHA256 over `token || session_id`, no salt, empty info, 32-byte output.
///
/// # Errors
///
/// Returns [`KeyError::Derivation`] if HKDF rejects the output length, which
/// cannot happen for [`KEY_LEN`].
pub fn derive_key(credential: &SessionCredential) -> Result<DerivedKey, KeyError> {
    let mut ikm = Zeroizing::new(Vec::with_capacity(
        credential.token().len() + credential.session_id().len(),
    ));
    ikm.extend_from_slice(credential.token().as_bytes());
    ikm.extend_from_slice(credential.session_id().as_bytes());

    let hkdf = Hkdf::<Sha256>::new(None, &ikm);
    let mut key = DerivedKey([0u8; KEY_LEN]);
    hkdf.expand(&[], &mut key.0)
        .map_err(|_| KeyError::Derivation)?;
    Ok(key)
}

struct CachedKey {
    key: Arc<DerivedKey>,
    created_at: Instant,
    /// Insertion order; breaks ties between equal `created_at` instants.
    seq: u64,
}

impl CachedKey {
    fn is_live(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) < ttl
    }
}

#[derive(Default)]
struct Entries {
    map: HashMap<CredentialId, CachedKey>,
    next_seq: u64,
}

impl Entries {
    fn insert(&mut self, id: CredentialId, key: Arc<DerivedKey>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.map.insert(
            id,
            CachedKey {
                key,
                created_at: Instant::now(),
                seq,
            },
        );
    }

    /// Linear scan for the entry created first. Fine at a few thousand entries.
    fn evict_oldest(&mut self) {
        let oldest = self
            .map
            .iter()
            .min_by_key(|(_, entry)| (entry.created_at, entry.seq))
            .map(|(id, _)| *id);
        if let Some(id) = oldest {
            self.map.remove(&id);
        }
    }
}

/// Process-wide cache mapping credentials to derived keys.
///
/// Wraps an `Arc<RwLock<_>>` so that:
/// - Request handlers holding a live key only ever take the read lock, and
///   many of them proceed concurrently.
/// - Misses, expiry, and eviction take the write lock and re-check before
///   deriving, so concurrent misses on one credential derive exactly once.
///
/// Eviction is by creation time, not by access: a hit does not extend an
/// entry's life or move it away from eviction.
#[derive(Clone)]
pub struct KeyCache {
    inner: Arc<RwLock<Entries>>,
    capacity: usize,
    ttl: Duration,
    derivations: Arc<AtomicU64>,
}

impl KeyCache {
    /// Create an empty cache with [`DEFAULT_CAPACITY`] and [`DEFAULT_TTL`].
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_CAPACITY, DEFAULT_TTL)
    }

    /// Create an empty cache with an explicit bound and key lifetime.
    ///
    /// A `capacity` of zero is raised to one.
    pub fn with_limits(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Entries::default())),
            capacity: capacity.max(1),
            ttl,
            derivations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Return the key for `credential`, deriving and caching it on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Derivation`] if HKDF fails.
    pub async fn derive(&self, credential: &SessionCredential) -> Result<Arc<DerivedKey>, KeyError> {
        let id = credential.cache_id();

        {
            let entries = self.inner.read().await;
            if let Some(entry) = entries.map.get(&id) {
                if entry.is_live(Instant::now(), self.ttl) {
                    return Ok(Arc::clone(&entry.key));
                }
            }
        }

        let mut entries = self.inner.write().await;

        // Another task may have refreshed the entry while we waited.
        if let Some(entry) = entries.map.get(&id) {
            if entry.is_live(Instant::now(), self.ttl) {
                return Ok(Arc::clone(&entry.key));
            }
            entries.map.remove(&id);
        }

        let key = Arc::new(derive_key(credential)?);
        if entries.map.len() >= self.capacity {
            entries.evict_oldest();
        }
        entries.insert(id, Arc::clone(&key));
        self.derivations.fetch_add(1, Ordering::Relaxed);
        debug!(cached = entries.map.len(), "derived session key");

        Ok(key)
    }

    /// Returns `true` if a live key is cached for `credential`.
    pub async fn contains(&self, credential: &SessionCredential) -> bool {
        let entries = self.inner.read().await;
        entries
            .map
            .get(&credential.cache_id())
            .is_some_and(|entry| entry.is_live(Instant::now(), self.ttl))
    }

    /// Number of entries held, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.map.is_empty()
    }

    /// Total number of HKDF derivations this cache has performed.
    pub fn derivations(&self) -> u64 {
        self.derivations.load(Ordering::Relaxed)
    }

    /// Remove every expired entry and return how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.inner.write().await;
        let now = Instant::now();
        let before = entries.map.len();
        entries.map.retain(|_, entry| entry.is_live(now, self.ttl));
        before - entries.map.len()
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCache")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .field("derivations", &self.derivations())
            .finish_non_exhaustive()
    }
}
