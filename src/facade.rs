//! Stable, error-isolated API surface for application code (spec §4.7).
//!
//! Grounded on `facade.py::PublicCache` / `safe_cache_call`. Every public
//! method here is wrapped in [`Facade::recover`], which logs and returns
//! a caller-chosen default instead of letting a cache-layer failure reach
//! the business path — Rust has no exception model to intercept, so this
//! is a closure-wrapping helper rather than a decorator.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use crate::collaborators::{SessionStatus, VectorAnswer, VectorQuery};
use crate::config_loader::ConfigLoader;
use crate::entry::now_millis;
use crate::error::CacheError;
use crate::key_builder;
use crate::manager::Manager;
use crate::policy::{Loader, Persister};
use crate::store::RegionStats;
use crate::Value;

const SESSIONS: &str = "sessions";
const USERS: &str = "users";
const CONFIG: &str = "config";
const API_RESPONSE: &str = "api_response";
const REPORTS: &str = "reports";
const STOCK_MARKET: &str = "stock_market";

pub struct Facade {
    manager: Arc<Manager>,
    config_loader: Option<Arc<ConfigLoader>>,
}

impl Facade {
    #[must_use]
    pub fn new(manager: Arc<Manager>) -> Self {
        Self {
            manager,
            config_loader: None,
        }
    }

    /// Wires in the `ConfigLoader` `set_config` awaits after every write
    /// (spec §2: "also triggers `ConfigLoader.reload` to refresh the
    /// region"). Without one, `set_config` still writes the entry and
    /// runs the persister, it just has nothing to reload against.
    #[must_use]
    pub fn with_config_loader(mut self, config_loader: Arc<ConfigLoader>) -> Self {
        self.config_loader = Some(config_loader);
        self
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    fn recover<T>(&self, op: &str, default: T, f: impl FnOnce() -> anyhow::Result<T>) -> T {
        match f() {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(op, error = %err, "cache operation failed");
                default
            }
        }
    }

    // ---------- Session (Write-Behind) ----------

    pub fn get_session(&self, id: i64) -> Option<Value> {
        self.recover("get_session", None, || {
            if !self.manager.has_region(SESSIONS) {
                return Ok(None);
            }
            let key = key_builder::session(id);
            Ok(self.manager.with_region(SESSIONS, |r| r.get(&key, None))??)
        })
    }

    pub fn set_session_heartbeat(&self, id: i64, status: SessionStatus, ip: &str) {
        self.recover("set_session_heartbeat", (), || {
            if !self.manager.has_region(SESSIONS) {
                return Ok(());
            }
            let key = key_builder::session(id);
            let data = json!({
                "status": status.as_str(),
                "last_active": now_millis() / 1000,
                "ip_address": ip,
            });
            self.manager.with_region(SESSIONS, |r| r.set(&key, data, None))??;
            Ok(())
        });
    }

    pub fn remove_session(&self, id: i64) {
        if self.manager.has_region(SESSIONS) {
            let key = key_builder::session(id);
            let _ = self.manager.with_region(SESSIONS, |r| r.delete(&key));
        }
    }

    // ---------- User (Cache-Aside) ----------

    pub fn get_user(&self, id: i64, loader: Option<&Loader>) -> Option<Value> {
        self.recover("get_user", None, || {
            if !self.manager.has_region(USERS) {
                return Ok(loader.and_then(|l| l()));
            }
            let key = key_builder::user(id);
            Ok(self.manager.with_region(USERS, |r| r.get(&key, loader))??)
        })
    }

    pub fn invalidate_user(&self, id: i64) {
        if self.manager.has_region(USERS) {
            let key = key_builder::user(id);
            let _ = self.manager.with_region(USERS, |r| r.delete(&key));
        }
    }

    // ---------- Config (Write-Through, direct-write on update) ----------

    pub fn get_config(&self, key: &str, loader: Option<&Loader>) -> Option<Value> {
        self.recover("get_config", None, || {
            if !self.manager.has_region(CONFIG) {
                return Ok(loader.and_then(|l| l()));
            }
            let cache_key = key_builder::config(key);
            Ok(self.manager.with_region(CONFIG, |r| r.get(&cache_key, loader))??)
        })
    }

    /// Writes directly into the cache, bypassing the config region's
    /// normal `set` path — every `Policy` variant supports `set_direct`
    /// (spec §4.2, §4.11), so this always takes the direct-write branch
    /// the Python original reserved for policies exposing it. Then runs
    /// `persister` (if given) to persist the new value, and finally
    /// awaits a full `ConfigLoader::reload` so the region converges with
    /// persistence rather than holding only the one changed key (spec §2).
    pub async fn set_config(&self, key: &str, value: Value, persister: Option<&Persister>) {
        if self.manager.has_region(CONFIG) {
            let cache_key = key_builder::config(key);
            let _ = self.manager.with_region(CONFIG, |r| {
                if let Some(store) = r.as_object() {
                    store.set_direct(&cache_key, value.clone(), None);
                }
            });
        }

        if let Some(persist) = persister {
            if let Err(err) = persist(&value) {
                tracing::error!(key, error = %err, "set_config persister failed");
            }
        }

        if let Some(loader) = &self.config_loader {
            if let Err(err) = loader.reload().await {
                tracing::error!(key, error = %err, "config reload after set_config failed");
            }
        }
    }

    // ---------- API response cache (FileStore) ----------

    pub fn get_api_cache(&self, endpoint: &str, params_hash: &str, loader: Option<&Loader>) -> Option<Value> {
        self.recover("get_api_cache", None, || {
            if !self.manager.has_region(API_RESPONSE) {
                return Ok(loader.and_then(|l| l()));
            }
            let key = key_builder::api(endpoint, params_hash);
            Ok(self.manager.with_region(API_RESPONSE, |r| r.get(&key, loader))??)
        })
    }

    pub fn set_api_cache(&self, endpoint: &str, params_hash: &str, value: Value, ttl_secs: u64) {
        self.recover("set_api_cache", (), || {
            if !self.manager.has_region(API_RESPONSE) {
                return Ok(());
            }
            let key = key_builder::api(endpoint, params_hash);
            self.manager
                .with_region(API_RESPONSE, |r| {
                    if let Some(store) = r.as_file() {
                        store.set(&key, value, ttl_secs)
                    } else {
                        Ok(())
                    }
                })??;
            Ok(())
        });
    }

    // ---------- Stock / sector / hotspot / signal (VectorStore + FileStore passthroughs) ----------

    pub fn stock_rank(&self, date: &str, top_n: usize) -> anyhow::Result<VectorAnswer> {
        self.manager
            .with_region(STOCK_MARKET, |r| match r.as_vector() {
                Some(v) => v.query(VectorQuery::TopNByRank {
                    date: date.to_string(),
                    top_n,
                }),
                None => Err(CacheError::UnsupportedOperation.into()),
            })?
    }

    pub fn stock_by_code(&self, code: &str) -> anyhow::Result<VectorAnswer> {
        self.manager
            .with_region(STOCK_MARKET, |r| match r.as_vector() {
                Some(v) => v.query(VectorQuery::ByCode { code: code.to_string() }),
                None => Err(CacheError::UnsupportedOperation.into()),
            })?
    }

    pub fn stock_by_codes(&self, codes: Vec<String>) -> anyhow::Result<VectorAnswer> {
        self.manager
            .with_region(STOCK_MARKET, |r| match r.as_vector() {
                Some(v) => v.query(VectorQuery::ByCodes { codes }),
                None => Err(CacheError::UnsupportedOperation.into()),
            })?
    }

    pub fn stock_history(&self, code: &str, start_date: &str, end_date: &str) -> anyhow::Result<VectorAnswer> {
        self.manager
            .with_region(STOCK_MARKET, |r| match r.as_vector() {
                Some(v) => v.query(VectorQuery::History {
                    code: code.to_string(),
                    start_date: start_date.to_string(),
                    end_date: end_date.to_string(),
                }),
                None => Err(CacheError::UnsupportedOperation.into()),
            })?
    }

    pub fn sector_list(&self, date: &str) -> Option<Value> {
        self.recover("sector_list", None, || {
            let key = key_builder::sector_list(date);
            self.get_api_cache_raw(&key, None)
        })
    }

    pub fn hotspot_daily(&self, date: &str, loader: Option<&Loader>) -> Option<Value> {
        self.recover("hotspot_daily", None, || {
            let key = key_builder::hotspot(date);
            self.get_api_cache_raw(&key, loader)
        })
    }

    pub fn cache_hotspot(&self, date: &str, data: Value) {
        self.recover("cache_hotspot", (), || {
            if !self.manager.has_region(API_RESPONSE) {
                return Ok(());
            }
            let key = key_builder::hotspot(date);
            self.manager
                .with_region(API_RESPONSE, |r| r.as_file().map(|s| s.set(&key, data, 86_400)))?
                .transpose()?;
            Ok(())
        });
    }

    pub fn signal_scan(&self, date: &str, signal_type: &str, loader: Option<&Loader>) -> Option<Value> {
        self.recover("signal_scan", None, || {
            let key = key_builder::signal(signal_type, date);
            self.get_api_cache_raw(&key, loader)
        })
    }

    pub fn industry_jump(&self, date: &str, days: u32, loader: Option<&Loader>) -> Option<Value> {
        self.recover("industry_jump", None, || {
            let key = key_builder::industry_jump(date, days);
            self.get_api_cache_raw(&key, loader)
        })
    }

    fn get_api_cache_raw(&self, key: &str, loader: Option<&Loader>) -> anyhow::Result<Option<Value>> {
        if !self.manager.has_region(API_RESPONSE) {
            return Ok(loader.and_then(|l| l()));
        }
        Ok(self.manager.with_region(API_RESPONSE, |r| r.get(key, loader))??)
    }

    // ---------- Reports (FileStore, large payloads) ----------

    pub fn get_report(&self, report_type: &str, params_hash: &str) -> Option<Value> {
        self.recover("get_report", None, || {
            if !self.manager.has_region(REPORTS) {
                return Ok(None);
            }
            let key = key_builder::report(report_type, params_hash);
            Ok(self.manager.with_region(REPORTS, |r| r.get(&key, None))??)
        })
    }

    pub fn cache_report(&self, report_type: &str, params_hash: &str, content: Value, ttl_secs: u64) {
        self.recover("cache_report", (), || {
            if !self.manager.has_region(REPORTS) {
                return Ok(());
            }
            let key = key_builder::report(report_type, params_hash);
            self.manager
                .with_region(REPORTS, |r| r.as_file().map(|s| s.set(&key, content, ttl_secs)))?
                .transpose()?;
            Ok(())
        });
    }

    // ---------- Admin ----------

    #[must_use]
    pub fn stats(&self) -> HashMap<String, RegionStats> {
        self.manager.stats()
    }

    pub fn gc(&self) {
        self.manager.gc();
    }

    pub fn clear_api_cache(&self) {
        if self.manager.has_region(API_RESPONSE) {
            let _ = self.manager.with_region(API_RESPONSE, |r| r.as_file().map(|s| s.clear()));
        }
    }

    pub fn clear_report_cache(&self) {
        if self.manager.has_region(REPORTS) {
            let _ = self.manager.with_region(REPORTS, |r| r.as_file().map(|s| s.clear()));
        }
    }

    pub fn reload_stock_data(&self) {
        if self.manager.has_region(STOCK_MARKET) {
            let _ = self
                .manager
                .with_region(STOCK_MARKET, |r| r.as_vector().map(|s| s.reload()));
        }
    }
}
