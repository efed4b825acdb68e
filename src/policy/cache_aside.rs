//! Cache-Aside: read through on miss, delete (not update) on write.
//!
//! Grounded on `policies/cache_aside.py`. Good fit for read-heavy, rarely
//! written data (user profile fields, global config, instrument lists).

use super::{Loader, Persister, Store};
use crate::entry::Entry;
use crate::Value;

#[derive(Debug, Clone)]
pub struct CacheAsidePolicy {
    pub ttl_secs: u64,
}

impl CacheAsidePolicy {
    #[must_use]
    pub fn new(ttl_secs: u64) -> Self {
        Self { ttl_secs }
    }

    pub fn get(&self, key: &str, store: &mut Store, loader: Option<&Loader>) -> Option<Value> {
        if let Some(entry) = store.get_mut(key) {
            if entry.is_expired() {
                store.remove(key);
            } else {
                entry.touch();
                return Some(entry.value.clone());
            }
        }

        let loader = loader?;
        let value = loader()?;
        store.insert(key.to_string(), Entry::new(value.clone(), self.ttl_secs, 1));
        Some(value)
    }

    /// Writes through `persister` first, then evicts the cached entry so
    /// the next `get` lazily reloads it.
    pub fn set(
        &self,
        key: &str,
        value: Value,
        store: &mut Store,
        persister: Option<&Persister>,
    ) -> anyhow::Result<()> {
        if let Some(persister) = persister {
            persister(&value)?;
        }
        store.remove(key);
        Ok(())
    }

    pub fn delete(&self, key: &str, store: &mut Store) -> bool {
        store.remove(key).is_some()
    }
}
