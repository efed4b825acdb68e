//! Cache entry: value plus TTL, dirty flag, version, and LRU metadata.
//!
//! Mirrors the metadata split in `storage::record::RecordMetadata`, but
//! collapsed into a single struct since a cache [`Entry`] carries no
//! separate CRDT payload.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time as milliseconds since the Unix epoch.
#[allow(clippy::cast_possible_truncation)]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// A cached value with expiry, access, dirty, and version metadata.
///
/// Invariant: `is_expired() <=> expire_at != 0 && now > expire_at`. A dirty
/// entry may coexist with expiry — the Syncer is responsible for flushing
/// dirty entries before they are evicted.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    pub value: T,
    /// Absolute expiry time in millis since epoch. 0 = never.
    expire_at: i64,
    last_access: i64,
    dirty: bool,
    version: u64,
}

impl<T> Entry<T> {
    /// Creates a new entry. `ttl_secs = 0` disables expiry unconditionally.
    #[must_use]
    pub fn new(value: T, ttl_secs: u64, version: u64) -> Self {
        let now = now_millis();
        let expire_at = if ttl_secs > 0 {
            now + (ttl_secs as i64) * 1000
        } else {
            0
        };
        Self {
            value,
            expire_at,
            last_access: now,
            dirty: false,
            version,
        }
    }

    /// Creates a new entry with an explicit creation timestamp, for tests
    /// that need deterministic clocks.
    #[must_use]
    pub fn new_at(value: T, ttl_secs: u64, version: u64, now: i64) -> Self {
        let expire_at = if ttl_secs > 0 {
            now + (ttl_secs as i64) * 1000
        } else {
            0
        };
        Self {
            value,
            expire_at,
            last_access: now,
            dirty: false,
            version,
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expire_at != 0 && now > self.expire_at
    }

    /// Updates `last_access` only. Does not extend expiry.
    pub fn touch(&mut self) {
        self.last_access = now_millis();
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn last_access(&self) -> i64 {
        self.last_access
    }

    #[must_use]
    pub fn is_stale(&self, current_version: u64) -> bool {
        self.version < current_version
    }

    /// Remaining TTL in seconds, or `None` for an entry that never expires.
    #[must_use]
    pub fn remaining_ttl_secs(&self) -> Option<u64> {
        if self.expire_at == 0 {
            return None;
        }
        let remaining_ms = self.expire_at - now_millis();
        Some(u64::try_from(remaining_ms.max(0)).unwrap_or(0) / 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ttl_zero_never_expires() {
        let e = Entry::new(42, 0, 1);
        assert!(!e.is_expired());
        assert_eq!(e.remaining_ttl_secs(), None);
    }

    #[test]
    fn expires_after_ttl_elapses() {
        let e = Entry::new_at(42, 5, 1, 1_000_000);
        assert!(!e.is_expired_at(1_004_999));
        assert!(e.is_expired_at(1_005_001));
    }

    #[test]
    fn touch_does_not_extend_expiry() {
        let mut e = Entry::new_at("v", 5, 1, 1_000_000);
        e.touch();
        assert!(e.is_expired_at(1_005_001));
    }

    #[test]
    fn dirty_flag_round_trips() {
        let mut e = Entry::new(1, 0, 1);
        assert!(!e.is_dirty());
        e.mark_dirty();
        assert!(e.is_dirty());
        e.clear_dirty();
        assert!(!e.is_dirty());
    }

    #[test]
    fn is_stale_compares_version() {
        let e = Entry::new(1, 0, 3);
        assert!(e.is_stale(4));
        assert!(!e.is_stale(3));
        assert!(!e.is_stale(2));
    }

    proptest! {
        /// Any nonzero TTL expires at exactly `now + ttl_secs*1000`, never
        /// a millisecond earlier, for every `(ttl_secs, now)` pair.
        #[test]
        fn nonzero_ttl_expires_exactly_at_boundary(
            ttl_secs in 1u64..1_000_000,
            now in 0i64..1_000_000_000_000,
        ) {
            let e = Entry::new_at(0, ttl_secs, 1, now);
            let expire_at = now + (ttl_secs as i64) * 1000;
            prop_assert!(!e.is_expired_at(expire_at));
            prop_assert!(e.is_expired_at(expire_at + 1));
        }

        /// `ttl_secs = 0` never expires, no matter how far `now` advances.
        #[test]
        fn zero_ttl_never_expires(
            now in 0i64..1_000_000_000_000,
            check in 0i64..2_000_000_000_000,
        ) {
            let e = Entry::new_at(0, 0, 1, now);
            prop_assert!(!e.is_expired_at(check));
            prop_assert_eq!(e.remaining_ttl_secs(), None);
        }
    }
}
