//! In-memory object region (spec §4.3). Grounded on `store.py::ObjectStore`
//! and `storage/engines/hashmap.rs` for the lock-guarded map shape.

use parking_lot::Mutex;
use serde::Serialize;

use crate::policy::{DirtySet, Loader, Persister, Policy, Store};
use crate::Value;

struct Inner {
    map: Store,
    dirty: DirtySet,
}

/// A named, policy-driven in-memory cache region.
///
/// `map` and `dirty` share one `parking_lot::Mutex` rather than a
/// reentrant lock: every `Policy` method takes the unlocked collections
/// as `&mut`, so nothing inside a `Policy` call ever tries to reacquire
/// this store's own lock (spec §5).
pub struct ObjectStore {
    name: String,
    policy: Policy,
    inner: Mutex<Inner>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectStats {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub total: usize,
    pub expired: usize,
    pub dirty: usize,
    pub active: usize,
}

impl ObjectStore {
    #[must_use]
    pub fn new(name: impl Into<String>, policy: Policy) -> Self {
        Self {
            name: name.into(),
            policy,
            inner: Mutex::new(Inner {
                map: Store::new(),
                dirty: DirtySet::new(),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn get(&self, key: &str, loader: Option<&Loader>) -> Option<Value> {
        let mut inner = self.inner.lock();
        let Inner { map, dirty } = &mut *inner;
        self.policy.get(key, map, dirty, loader)
    }

    pub fn set(&self, key: &str, value: Value, persister: Option<&Persister>) -> anyhow::Result<()> {
        let mut inner = self.inner.lock();
        let Inner { map, dirty } = &mut *inner;
        self.policy.set(key, value, map, dirty, persister)
    }

    /// Bypasses the policy's normal write semantics (spec §4.2, §4.11):
    /// used for Cache-Aside warm-up and by `ConfigLoader` refreshing a
    /// Write-Through config region.
    pub fn set_direct(&self, key: &str, value: Value, ttl_override: Option<u64>) {
        let mut inner = self.inner.lock();
        self.policy.set_direct(key, value, &mut inner.map, ttl_override);
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        let Inner { map, dirty } = &mut *inner;
        self.policy.delete(key, map, dirty)
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.dirty.clear();
    }

    /// Removes all expired entries, returning how many were dropped.
    /// Called by `Manager::gc` for every object region (spec §4.6).
    pub fn clear_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .map
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for k in &expired {
            inner.map.remove(k);
            inner.dirty.remove(k);
        }
        expired.len()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().map.keys().cloned().collect()
    }

    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.inner
            .lock()
            .map
            .values()
            .filter(|e| !e.is_expired())
            .map(|e| e.value.clone())
            .collect()
    }

    #[must_use]
    pub fn items(&self) -> Vec<(String, Value)> {
        self.inner
            .lock()
            .map
            .iter()
            .filter(|(_, e)| !e.is_expired())
            .map(|(k, e)| (k.clone(), e.value.clone()))
            .collect()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// Atomically drains the dirty set, for the Syncer's session/config
    /// drain cycle (spec §4.8). A no-op set for non-`WriteBehind` policies.
    #[must_use]
    pub fn drain_dirty(&self) -> DirtySet {
        let mut inner = self.inner.lock();
        self.policy.drain_dirty(&mut inner.dirty)
    }

    /// Snapshots `(key, value)` pairs for the given keys without clearing
    /// their dirty flag — the Syncer clears flags itself, right after
    /// this snapshot and before the persistence batch runs, regardless of
    /// whether that batch succeeds.
    #[must_use]
    pub fn snapshot(&self, keys: &DirtySet) -> Vec<(String, Value)> {
        let inner = self.inner.lock();
        keys.iter()
            .filter_map(|k| inner.map.get(k).map(|e| (k.clone(), e.value.clone())))
            .collect()
    }

    pub fn clear_dirty_flags(&self, keys: &DirtySet) {
        let mut inner = self.inner.lock();
        for k in keys {
            if let Some(e) = inner.map.get_mut(k) {
                e.clear_dirty();
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> ObjectStats {
        let inner = self.inner.lock();
        let total = inner.map.len();
        let expired = inner.map.values().filter(|e| e.is_expired()).count();
        let dirty = inner.map.values().filter(|e| e.is_dirty()).count();
        ObjectStats {
            name: self.name.clone(),
            kind: "object",
            total,
            expired,
            dirty,
            active: total - expired,
        }
    }
}
