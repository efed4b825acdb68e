//! Caching policies: Write-Behind, Write-Through, Cache-Aside (spec §4.2).
//!
//! Grounded on `examples/original_source/.../policies/*.py` for exact
//! branch semantics, with the dirty set folded into `ObjectStore`'s own
//! lock rather than given a private lock of its own (spec §5: "inside the
//! lock, Policy implementations are free to mutate the internal dirty
//! set").

pub mod cache_aside;
pub mod write_behind;
pub mod write_through;

use std::collections::{HashMap, HashSet};

use crate::entry::Entry;
use crate::Value;

/// Loader invoked on cache miss. Returning `None` means "no value"; the
/// caller (`CacheAside`/`WriteThrough`) does not insert an entry in that case.
pub type Loader<'a> = dyn Fn() -> Option<Value> + 'a;

/// Persister invoked synchronously by `WriteThrough::set` and, before the
/// delete, by `CacheAside::set`.
pub type Persister<'a> = dyn Fn(&Value) -> anyhow::Result<()> + 'a;

pub type Store = HashMap<String, Entry<Value>>;
pub type DirtySet = HashSet<String>;

/// One of the three caching strategies a region's `ObjectStore` can run.
///
/// Variants carry only configuration; the mutable map and dirty set are
/// owned by `ObjectStore` and passed in on every call, since all three
/// variants run under the same store-wide lock.
#[derive(Debug, Clone)]
pub enum Policy {
    CacheAside(cache_aside::CacheAsidePolicy),
    WriteBehind(write_behind::WriteBehindPolicy),
    WriteThrough(write_through::WriteThroughPolicy),
}

impl Policy {
    #[must_use]
    pub fn cache_aside(ttl_secs: u64) -> Self {
        Policy::CacheAside(cache_aside::CacheAsidePolicy::new(ttl_secs))
    }

    #[must_use]
    pub fn write_behind(ttl_secs: u64, sync_interval_secs: u64) -> Self {
        Policy::WriteBehind(write_behind::WriteBehindPolicy::new(ttl_secs, sync_interval_secs))
    }

    #[must_use]
    pub fn write_through(ttl_secs: u64) -> Self {
        Policy::WriteThrough(write_through::WriteThroughPolicy::new(ttl_secs))
    }

    pub fn get(&self, key: &str, store: &mut Store, dirty: &mut DirtySet, loader: Option<&Loader>) -> Option<Value> {
        match self {
            Policy::CacheAside(p) => p.get(key, store, loader),
            Policy::WriteBehind(p) => p.get(key, store, dirty),
            Policy::WriteThrough(p) => p.get(key, store, loader),
        }
    }

    pub fn set(
        &self,
        key: &str,
        value: Value,
        store: &mut Store,
        dirty: &mut DirtySet,
        persister: Option<&Persister>,
    ) -> anyhow::Result<()> {
        match self {
            Policy::CacheAside(p) => p.set(key, value, store, persister),
            Policy::WriteBehind(p) => {
                p.set(key, value, store, dirty);
                Ok(())
            }
            Policy::WriteThrough(p) => p.set(key, value, store, persister),
        }
    }

    pub fn delete(&self, key: &str, store: &mut Store, dirty: &mut DirtySet) -> bool {
        match self {
            Policy::CacheAside(p) => p.delete(key, store),
            Policy::WriteBehind(p) => p.delete(key, store, dirty),
            Policy::WriteThrough(p) => p.delete(key, store),
        }
    }

    /// Directly installs a fresh entry, bypassing the variant's normal
    /// `set` behavior (no delete-on-write for Cache-Aside, no persister
    /// call for Write-Through, no dirty-marking for Write-Behind). Used
    /// for explicit warm-up (Cache-Aside, spec §4.2) and by `ConfigLoader`
    /// reloading the config region (spec §4.11).
    pub fn set_direct(&self, key: &str, value: Value, store: &mut Store, ttl_override: Option<u64>) {
        let ttl = ttl_override.unwrap_or_else(|| self.ttl_secs());
        store.insert(key.to_string(), Entry::new(value, ttl, 1));
    }

    #[must_use]
    pub fn ttl_secs(&self) -> u64 {
        match self {
            Policy::CacheAside(p) => p.ttl_secs,
            Policy::WriteBehind(p) => p.ttl_secs,
            Policy::WriteThrough(p) => p.ttl_secs,
        }
    }

    #[must_use]
    pub fn is_write_behind(&self) -> bool {
        matches!(self, Policy::WriteBehind(_))
    }

    /// Atomically drains the dirty set. Only meaningful for `WriteBehind`;
    /// other variants never populate `dirty` so this is always empty for them.
    pub fn drain_dirty(&self, dirty: &mut DirtySet) -> DirtySet {
        std::mem::take(dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_direct_bypasses_cache_aside_delete_semantics() {
        let policy = Policy::cache_aside(60);
        let mut store = Store::new();
        let mut dirty = DirtySet::new();
        policy.set_direct("k", json!("v"), &mut store, None);
        assert_eq!(
            policy.get("k", &mut store, &mut dirty, None),
            Some(json!("v"))
        );
    }

    #[test]
    fn drain_dirty_empties_set() {
        let policy = Policy::write_behind(1800, 10);
        let mut store = Store::new();
        let mut dirty = DirtySet::new();
        policy.set("k", json!(1), &mut store, &mut dirty, None).unwrap();
        let drained = policy.drain_dirty(&mut dirty);
        assert_eq!(drained.len(), 1);
        assert!(dirty.is_empty());
        assert!(policy.drain_dirty(&mut dirty).is_empty());
    }
}
