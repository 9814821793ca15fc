//! Session key derivation, caching, and background expiry.
//!
//! # Lifecycle
//!
//! 1. A request's `Authorization` bearer token and `X-Session-ID` form a
//!    [`SessionCredential`].
//! 2. [`KeyCache::derive`] returns the cached key or derives one with
//!    HKDF-SHA256 and caches it.
//! 3. Entries older than the TTL are treated as absent and re-derived on the
//!    next lookup; [`sweep_task`] also drops them periodically so idle
//!    sessions do not hold memory until capacity eviction.
//!
//! # Security invariants
//!
//! - Key bytes and tokens are **never** written to disk, logged, or included
//!   in traces.
//! - Key buffers are zeroed when the last reference is dropped.

pub mod credential;
pub mod store;

pub use credential::SessionCredential;
pub use store::{DerivedKey, KeyCache, KeyError};

use std::time::Duration;

use tokio::time;
use tracing::debug;

/// Spawn a background task that purges expired keys every `interval`.
///
/// The first sweep fires after one full interval.
pub fn sweep_task(cache: KeyCache, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        // First tick fires immediately; the cache starts empty.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = cache.purge_expired().await;
            if purged > 0 {
                let remaining = cache.len().await;
                debug!(purged, remaining, "expired session keys purged");
            }
        }
    })
}
