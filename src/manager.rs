//! Region registry (spec §4.6). Grounded on `service/registry.rs`'s
//! `ServiceRegistry`: name-keyed `DashMap`, but with no type-based lookup
//! or init ordering — regions don't have a shutdown lifecycle of their
//! own, so there is nothing here to sequence.

use std::collections::HashMap;

use dashmap::DashMap;
use tracing::info;

use crate::error::CacheError;
use crate::store::{Region, RegionStats};

/// Named registry of regions. Populated once at startup ([`crate::wiring`])
/// and read for the remainder of the process lifetime.
#[derive(Default)]
pub struct Manager {
    regions: DashMap<String, Region>,
}

impl Manager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regions: DashMap::new(),
        }
    }

    pub fn register(&self, name: impl Into<String>, region: Region) {
        self.regions.insert(name.into(), region);
    }

    pub fn unregister(&self, name: &str) -> Option<Region> {
        self.regions.remove(name).map(|(_, r)| r)
    }

    #[must_use]
    pub fn has_region(&self, name: &str) -> bool {
        self.regions.contains_key(name)
    }

    #[must_use]
    pub fn region_names(&self) -> Vec<String> {
        self.regions.iter().map(|e| e.key().clone()).collect()
    }

    /// Runs `f` with a reference to the named region. Missing-region is
    /// the only failure mode at this layer (spec §4.6); the caller
    /// (`Facade`) decides whether to surface it or fall back.
    pub fn with_region<R>(&self, name: &str, f: impl FnOnce(&Region) -> R) -> Result<R, CacheError> {
        self.regions
            .get(name)
            .map(|entry| f(entry.value()))
            .ok_or_else(|| CacheError::MissingRegion(name.to_string()))
    }

    /// Aggregate stats across every region, keyed by region name.
    pub fn stats(&self) -> HashMap<String, RegionStats> {
        self.regions
            .iter()
            .filter_map(|entry| {
                let stats = match entry.value() {
                    Region::Object(s) => RegionStats::Object(s.stats()),
                    Region::Vector(s) => RegionStats::from((entry.key().clone(), s.stats())),
                    Region::File(s) => match s.stats() {
                        Ok(fs) => RegionStats::Disk {
                            name: fs.name,
                            size_mb: fs.size_mb,
                            count: fs.count,
                            directory: fs.directory,
                        },
                        Err(err) => {
                            tracing::error!(region = %entry.key(), error = %err, "file store stats failed");
                            return None;
                        }
                    },
                };
                Some((entry.key().clone(), stats))
            })
            .collect()
    }

    /// Clears expired entries from every `ObjectStore` region, skips
    /// `FileStore` (self-evicting) and `VectorStore` (no expiry concept),
    /// then asks the runtime to reclaim memory (spec §4.6).
    pub fn gc(&self) {
        for entry in &self.regions {
            if let Region::Object(store) = entry.value() {
                let removed = store.clear_expired();
                if removed > 0 {
                    info!(region = %entry.key(), removed, "gc cleared expired entries");
                }
            }
        }
    }

    /// Clears object and file regions; vector regions are left untouched
    /// since they require an explicit `reload` to repopulate (spec §4.6).
    pub fn clear_all(&self) {
        for entry in &self.regions {
            match entry.value() {
                Region::Object(store) => store.clear(),
                Region::File(store) => {
                    if let Err(err) = store.clear() {
                        tracing::error!(region = %entry.key(), error = %err, "file store clear failed");
                    }
                }
                Region::Vector(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::policy::Policy;
    use crate::store::ObjectStore;

    #[test]
    fn missing_region_errors() {
        let manager = Manager::new();
        let result = manager.with_region("sessions", |r| r.name().to_string());
        assert!(matches!(result, Err(CacheError::MissingRegion(_))));
    }

    #[test]
    fn register_and_lookup_round_trips() {
        let manager = Manager::new();
        manager.register(
            "sessions",
            Region::Object(ObjectStore::new("sessions", Policy::write_behind(1800, 10))),
        );
        assert!(manager.has_region("sessions"));
        assert_eq!(manager.region_names(), vec!["sessions".to_string()]);
    }

    #[test]
    fn gc_clears_expired_object_entries_only() {
        let manager = Manager::new();
        let store = ObjectStore::new("users", Policy::cache_aside(60));
        store.set_direct("stale", json!(1), Some(0));
        manager.register("users", Region::Object(store));
        manager.gc();
        // ttl=0 never expires, so gc is a no-op here; assert it didn't panic
        // and the entry survives.
        let size = manager
            .with_region("users", |r| r.as_object().unwrap().size())
            .unwrap();
        assert_eq!(size, 1);
    }
}
