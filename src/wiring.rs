//! Startup wiring: region registration, preload, Syncer lifecycle
//! (spec §4.12).
//!
//! `SubsystemHandle` follows the deferred-startup pattern from
//! `network/module.rs`: `new()` allocates shared state and registers
//! regions, `preload()` warms them, `start_syncer()` spawns the
//! background loop only once everything else exists, and `shutdown()`
//! tears it down in reverse order.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::audit::AuditBuffer;
use crate::collaborators::{MemoryMonitor, NullMemoryMonitor, Persistence, VectorSource};
use crate::config_loader::ConfigLoader;
use crate::facade::Facade;
use crate::manager::Manager;
use crate::policy::Policy;
use crate::store::{FileStore, ObjectStore, Region, VectorStore};
use crate::syncer::Syncer;

/// Byte-budget defaults from spec §4.5.
const API_RESPONSE_BUDGET_BYTES: u64 = 200 * 1024 * 1024;
const REPORTS_BUDGET_BYTES: u64 = 500 * 1024 * 1024;

/// Disk root and region policy knobs the hosting process supplies at
/// startup; everything else (region names, budgets) is fixed by spec §3.
pub struct SubsystemConfig {
    pub cache_dir: PathBuf,
    pub session_ttl_secs: u64,
    pub session_sync_interval_secs: u64,
    pub user_ttl_secs: u64,
    pub vector_source: Option<Arc<dyn VectorSource>>,
}

impl Default for SubsystemConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache"),
            session_ttl_secs: 1800,
            session_sync_interval_secs: 10,
            user_ttl_secs: 3600,
            vector_source: None,
        }
    }
}

/// Owns every long-lived piece of the caching subsystem: the region
/// registry, the audit buffer, the public `Facade`, and (once started)
/// the Syncer's join handle.
pub struct SubsystemHandle {
    manager: Arc<Manager>,
    audit: Arc<AuditBuffer>,
    facade: Facade,
    config_loader: Arc<ConfigLoader>,
    syncer: Arc<Syncer>,
    syncer_handle: Option<JoinHandle<()>>,
}

impl SubsystemHandle {
    /// Allocates the registry and registers the six regions spec §3
    /// names (`stock_market` only if a vector source was supplied).
    #[must_use]
    pub fn new(config: SubsystemConfig, persistence: Arc<dyn Persistence>, memory_monitor: Option<Arc<dyn MemoryMonitor>>) -> Self {
        let manager = Arc::new(Manager::new());

        manager.register(
            "sessions",
            Region::Object(ObjectStore::new(
                "sessions",
                Policy::write_behind(config.session_ttl_secs, config.session_sync_interval_secs),
            )),
        );
        manager.register(
            "users",
            Region::Object(ObjectStore::new("users", Policy::cache_aside(config.user_ttl_secs))),
        );
        manager.register(
            "config",
            Region::Object(ObjectStore::new("config", Policy::write_through(0))),
        );
        manager.register(
            "api_response",
            Region::File(FileStore::new("api_response", config.cache_dir.join("api_response"), API_RESPONSE_BUDGET_BYTES)),
        );
        manager.register(
            "reports",
            Region::File(FileStore::new("reports", config.cache_dir.join("reports"), REPORTS_BUDGET_BYTES)),
        );
        if let Some(source) = config.vector_source {
            manager.register("stock_market", Region::Vector(VectorStore::new("stock_market", source)));
        }

        let audit = Arc::new(AuditBuffer::default());
        let config_loader = Arc::new(ConfigLoader::new(manager.clone(), persistence.clone()));
        let facade = Facade::new(manager.clone()).with_config_loader(config_loader.clone());
        let memory_monitor = memory_monitor.unwrap_or_else(|| Arc::new(NullMemoryMonitor));
        let syncer = Arc::new(Syncer::new(manager.clone(), persistence, audit.clone(), memory_monitor));

        Self {
            manager,
            audit,
            facade,
            config_loader,
            syncer,
            syncer_handle: None,
        }
    }

    #[must_use]
    pub fn facade(&self) -> &Facade {
        &self.facade
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    #[must_use]
    pub fn audit(&self) -> &Arc<AuditBuffer> {
        &self.audit
    }

    #[must_use]
    pub fn config_loader(&self) -> &Arc<ConfigLoader> {
        &self.config_loader
    }

    /// Loads the config region, then runs any caller-supplied warm-up
    /// loaders concurrently — translating `startup.py::preload_cache`'s
    /// `ThreadPoolExecutor` fan-out into a set of spawned Tokio tasks.
    pub async fn preload(&self, warmups: Vec<JoinHandle<()>>) -> anyhow::Result<()> {
        info!("preloading cache subsystem");
        let loaded = self.config_loader.reload().await?;
        info!(loaded, "config region preloaded");

        for task in warmups {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "preload task failed");
            }
        }
        Ok(())
    }

    /// Spawns the Syncer. Must be called after every region above has
    /// been registered — `new()` already guarantees that.
    pub fn start_syncer(&mut self) {
        self.syncer_handle = Some(self.syncer.clone().spawn());
    }

    /// Stops the Syncer and waits for its final forced drain cycle
    /// before returning, so no dirty session or audit data is lost on
    /// process exit (spec §4.8, §8 scenario 6).
    pub async fn shutdown(mut self) {
        self.syncer.shutdown().await;
        if let Some(handle) = self.syncer_handle.take() {
            let _ = handle.await;
        }
        info!("cache subsystem shut down");
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tempfile::tempdir;

    use super::*;
    use crate::collaborators::{AuditRecord, ConfigRow, SessionUpdate};
    use crate::config_value::ConfigValue;

    struct NullPersistence;
    #[async_trait]
    impl Persistence for NullPersistence {
        async fn bulk_update_sessions(&self, _: Vec<SessionUpdate>) -> anyhow::Result<()> {
            Ok(())
        }
        async fn bulk_insert_audit(&self, _: Vec<AuditRecord>) -> anyhow::Result<()> {
            Ok(())
        }
        async fn load_all_config(&self) -> anyhow::Result<Vec<ConfigRow>> {
            Ok(vec![])
        }
        async fn update_config_row(&self, _key: &str, _value: &ConfigValue) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn new_registers_all_core_regions() {
        let dir = tempdir().unwrap();
        let handle = SubsystemHandle::new(
            SubsystemConfig {
                cache_dir: dir.path().to_path_buf(),
                ..SubsystemConfig::default()
            },
            Arc::new(NullPersistence),
            None,
        );
        for region in ["sessions", "users", "config", "api_response", "reports"] {
            assert!(handle.manager().has_region(region), "missing region {region}");
        }
        assert!(!handle.manager().has_region("stock_market"));
    }

    #[tokio::test]
    async fn start_then_shutdown_drains_syncer() {
        let dir = tempdir().unwrap();
        let mut handle = SubsystemHandle::new(
            SubsystemConfig {
                cache_dir: dir.path().to_path_buf(),
                ..SubsystemConfig::default()
            },
            Arc::new(NullPersistence),
            None,
        );
        handle.start_syncer();
        handle.facade().set_session_heartbeat(1, crate::collaborators::SessionStatus::Online, "127.0.0.1");
        handle.shutdown().await;
    }
}
