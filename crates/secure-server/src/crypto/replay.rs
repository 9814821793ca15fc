//! Freshness validation of decrypted payloads.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use common::{protocol::TIMESTAMP_FIELD, Payload};
use serde_json::Value;
use thiserror::Error;

/// Oldest accepted request age.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5 * 60);

/// Furthest a request timestamp may run ahead of the server clock.
pub const DEFAULT_MAX_SKEW: Duration = Duration::from_secs(5);

/// Why a payload failed freshness validation. Diagnostic only.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReplayError {
    /// `_timestamp` is absent or not a number.
    #[error("timestamp missing or not numeric")]
    Missing,

    /// The request is older than the accepted window.
    #[error("timestamp stale by {age_ms} ms")]
    Stale {
        /// Milliseconds between the request time and now.
        age_ms: i128,
    },

    /// The request claims to come from the future.
    #[error("timestamp {ahead_ms} ms ahead of server clock")]
    Skewed {
        /// Milliseconds the request time runs ahead of now.
        ahead_ms: i128,
    },
}

/// Rejects payloads whose embedded `_timestamp` falls outside
/// `[now - max_age, now + max_skew]`. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayGuard {
    max_age: Duration,
    max_skew: Duration,
}

impl ReplayGuard {
    /// Create a guard with explicit windows.
    pub fn new(max_age: Duration, max_skew: Duration) -> Self {
        Self { max_age, max_skew }
    }

    /// Validate `payload` against the instant `now`.
    ///
    /// # Errors
    ///
    /// Returns the specific [`ReplayError`] for local logging.
    pub fn validate(&self, payload: &Payload, now: SystemTime) -> Result<(), ReplayError> {
        let request_ms = payload
            .get(TIMESTAMP_FIELD)
            .and_then(timestamp_millis)
            .ok_or(ReplayError::Missing)?;
        let now_ms = epoch_millis(now);

        let age_ms = now_ms - request_ms;
        if age_ms > self.max_age.as_millis() as i128 {
            return Err(ReplayError::Stale { age_ms });
        }
        let ahead_ms = -age_ms;
        if ahead_ms > self.max_skew.as_millis() as i128 {
            return Err(ReplayError::Skewed { ahead_ms });
        }
        Ok(())
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE, DEFAULT_MAX_SKEW)
    }
}

/// Milliseconds since the Unix epoch; instants before the epoch count as 0.
pub fn epoch_millis(at: SystemTime) -> i128 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i128)
        .unwrap_or_default()
}

/// Integer timestamps are taken as-is; fractional ones are truncated toward zero
/// and clamped to the `i64` range so the age arithmetic cannot overflow.
fn timestamp_millis(value: &Value) -> Option<i128> {
    let Value::Number(n) = value else {
        return None;
    };
    if let Some(i) = n.as_i64() {
        Some(i128::from(i))
    } else if let Some(u) = n.as_u64() {
        Some(i128::from(u))
    } else {
        n.as_f64()
            .map(|f| f.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stamped(ms: i128) -> Payload {
        let mut p = Payload::new();
        p.insert("user".into(), json!("alice"));
        p.insert(TIMESTAMP_FIELD.into(), json!(ms as i64));
        p
    }

    fn now() -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(1_760_000_000_000)
    }

    #[test]
    fn freshness_boundaries() {
        let guard = ReplayGuard::default();
        let now_ms = epoch_millis(now());

        let cases = [
            (now_ms - 5 * 60_000 - 1_000, false),
            (now_ms - 5 * 60_000, true),
            (now_ms - 4 * 60_000, true),
            (now_ms, true),
            (now_ms + 1_000, true),
            (now_ms + 5_000, true),
            (now_ms + 5_001, false),
        ];
        for (ts, accepted) in cases {
            let result = guard.validate(&stamped(ts), now());
            assert_eq!(result.is_ok(), accepted, "offset {} ms", ts - now_ms);
        }
    }

    #[test]
    fn reasons_are_distinct_internally() {
        let guard = ReplayGuard::default();
        let now_ms = epoch_millis(now());

        assert!(matches!(
            guard.validate(&stamped(now_ms - 301_000), now()),
            Err(ReplayError::Stale { age_ms: 301_000 })
        ));
        assert!(matches!(
            guard.validate(&stamped(now_ms + 5_001), now()),
            Err(ReplayError::Skewed { ahead_ms: 5_001 })
        ));
    }

    #[test]
    fn missing_or_non_numeric_timestamp_rejected() {
        let guard = ReplayGuard::default();
        let mut p = Payload::new();
        assert_eq!(guard.validate(&p, now()), Err(ReplayError::Missing));

        for bad in [json!("1760000000000"), json!(null), json!(true), json!({"ms": 1})] {
            p.insert(TIMESTAMP_FIELD.into(), bad);
            assert_eq!(guard.validate(&p, now()), Err(ReplayError::Missing));
        }
    }

    #[test]
    fn float_timestamp_is_truncated() {
        let guard = ReplayGuard::default();
        let mut p = Payload::new();
        let ms = epoch_millis(now()) as f64 - 1_000.75;
        p.insert(TIMESTAMP_FIELD.into(), json!(ms));
        assert!(guard.validate(&p, now()).is_ok());
    }

    #[test]
    fn custom_windows_are_honoured() {
        let guard = ReplayGuard::new(Duration::from_secs(10), Duration::ZERO);
        let now_ms = epoch_millis(now());
        assert!(guard.validate(&stamped(now_ms - 10_000), now()).is_ok());
        assert!(guard.validate(&stamped(now_ms - 10_001), now()).is_err());
        assert!(guard.validate(&stamped(now_ms + 1), now()).is_err());
    }

    #[test]
    fn absurd_timestamps_do_not_overflow() {
        let guard = ReplayGuard::default();
        let mut p = Payload::new();
        p.insert(TIMESTAMP_FIELD.into(), json!(u64::MAX));
        assert!(matches!(guard.validate(&p, now()), Err(ReplayError::Skewed { .. })));
        p.insert(TIMESTAMP_FIELD.into(), json!(i64::MIN));
        assert!(matches!(guard.validate(&p, now()), Err(ReplayError::Stale { .. })));
        p.insert(TIMESTAMP_FIELD.into(), json!(1e300));
        assert!(matches!(guard.validate(&p, now()), Err(ReplayError::Skewed { .. })));
        p.insert(TIMESTAMP_FIELD.into(), json!(-1e300));
        assert!(matches!(guard.validate(&p, now()), Err(ReplayError::Stale { .. })));
    }
}
