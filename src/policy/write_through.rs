//! Write-Through: every write lands in memory and synchronously in
//! persistence before `set` returns. Strong consistency at the cost of
//! write latency, acceptable for low-frequency writes (password changes,
//! permission edits, account lock/unlock — spec §4.2).
//!
//! Grounded on `policies/write_through.py`.

use super::{Loader, Persister, Store};
use crate::entry::Entry;
use crate::Value;

#[derive(Debug, Clone)]
pub struct WriteThroughPolicy {
    pub ttl_secs: u64,
}

impl WriteThroughPolicy {
    #[must_use]
    pub fn new(ttl_secs: u64) -> Self {
        Self { ttl_secs }
    }

    /// Reads through on miss, same as `CacheAside::get`.
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

    pub fn set(
        &self,
        key: &str,
        value: Value,
        store: &mut Store,
        persister: Option<&Persister>,
    ) -> anyhow::Result<()> {
        store.insert(key.to_string(), Entry::new(value.clone(), self.ttl_secs, 1));
        if let Some(persister) = persister {
            persister(&value)?;
        }
        Ok(())
    }

    pub fn delete(&self, key: &str, store: &mut Store) -> bool {
        store.remove(key).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_updates_memory_before_persisting() {
        let policy = WriteThroughPolicy::new(0);
        let mut store = Store::new();
        let mut persisted = false;
        let persister = |_: &Value| {
            persisted = true;
            Ok(())
        };
        policy.set("k", json!("v"), &mut store, Some(&persister)).unwrap();
        assert!(persisted);
        assert_eq!(store.get("k").unwrap().value, json!("v"));
    }

    #[test]
    fn set_propagates_persister_failure() {
        let policy = WriteThroughPolicy::new(0);
        let mut store = Store::new();
        let persister = |_: &Value| anyhow::bail!("db down");
        assert!(policy.set("k", json!("v"), &mut store, Some(&persister)).is_err());
        // memory write already happened — write-through commits memory first.
        assert!(store.contains_key("k"));
    }

    #[test]
    fn zero_ttl_never_expires() {
        let policy = WriteThroughPolicy::new(0);
        let mut store = Store::new();
        policy.set("k", json!(1), &mut store, None).unwrap();
        assert!(!store.get("k").unwrap().is_expired());
    }
}
