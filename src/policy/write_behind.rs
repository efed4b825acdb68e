//! Write-Behind: writes land in memory only and are marked dirty; a
//! background syncer drains the dirty set and batches it to persistence.
//!
//! Grounded on `policies/write_behind.py`. Highest write throughput,
//! final consistency only — a crash between `set` and the next sync
//! drain loses the update. Acceptable for session heartbeats, last-active
//! timestamps, view counters (spec §4.2).
//!
//! The Python original keeps its own `dirty_keys: Set[str]` behind a
//! private lock. Here the dirty set is owned by `ObjectStore` instead,
//! since every `Policy` call already runs under the store's lock — see
//! the module doc on [`super::Policy`].

use super::{DirtySet, Store};
use crate::entry::Entry;
use crate::Value;

#[derive(Debug, Clone)]
pub struct WriteBehindPolicy {
    pub ttl_secs: u64,
    pub sync_interval_secs: u64,
}

impl WriteBehindPolicy {
    #[must_use]
    pub fn new(ttl_secs: u64, sync_interval_secs: u64) -> Self {
        Self {
            ttl_secs,
            sync_interval_secs,
        }
    }

    /// Write-Behind never reads through; a miss is a miss. An expired
    /// entry is evicted and dropped from the dirty set, discarding
    /// whatever unsynced write it carried.
    pub fn get(&self, key: &str, store: &mut Store, dirty: &mut DirtySet) -> Option<Value> {
        let entry = store.get_mut(key)?;
        if entry.is_expired() {
            store.remove(key);
            dirty.remove(key);
            return None;
        }
        entry.touch();
        Some(entry.value.clone())
    }

    pub fn set(&self, key: &str, value: Value, store: &mut Store, dirty: &mut DirtySet) {
        let mut entry = Entry::new(value, self.ttl_secs, 1);
        entry.mark_dirty();
        store.insert(key.to_string(), entry);
        dirty.insert(key.to_string());
    }

    pub fn delete(&self, key: &str, store: &mut Store, dirty: &mut DirtySet) -> bool {
        dirty.remove(key);
        store.remove(key).is_some()
    }
}
