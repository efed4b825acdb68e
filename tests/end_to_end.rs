//! Integration tests for the six end-to-end scenarios the caching
//! subsystem has to get right together, not just module-by-module.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use quantcache::collaborators::{AuditRecord, ConfigRow, NullMemoryMonitor, Persistence, SessionStatus, SessionUpdate};
use quantcache::config_loader::ConfigLoader;
use quantcache::config_value::ConfigValue;
use quantcache::facade::Facade;
use quantcache::manager::Manager;
use quantcache::policy::Policy;
use quantcache::policy_engine::PolicyEngine;
use quantcache::store::{FileStore, ObjectStore, Region};
use quantcache::syncer::Syncer;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Default)]
struct RecordingPersistence {
    session_batches: Mutex<Vec<Vec<SessionUpdate>>>,
    audit_batches: Mutex<Vec<Vec<AuditRecord>>>,
    config_rows: Mutex<Vec<ConfigRow>>,
}

#[async_trait]
impl Persistence for RecordingPersistence {
    async fn bulk_update_sessions(&self, updates: Vec<SessionUpdate>) -> anyhow::Result<()> {
        self.session_batches.lock().unwrap().push(updates);
        Ok(())
    }

    async fn bulk_insert_audit(&self, records: Vec<AuditRecord>) -> anyhow::Result<()> {
        self.audit_batches.lock().unwrap().push(records);
        Ok(())
    }

    async fn load_all_config(&self) -> anyhow::Result<Vec<ConfigRow>> {
        Ok(self.config_rows.lock().unwrap().clone())
    }

    async fn update_config_row(&self, key: &str, value: &ConfigValue) -> anyhow::Result<()> {
        let mut rows = self.config_rows.lock().unwrap();
        let (raw, value_type) = match value {
            ConfigValue::Int(i) => (i.to_string(), "int"),
            ConfigValue::Bool(b) => (b.to_string(), "bool"),
            ConfigValue::String(s) => (s.clone(), "string"),
            ConfigValue::Json(v) => (v.to_string(), "json"),
        };
        if let Some(row) = rows.iter_mut().find(|r| r.key == key) {
            row.value = raw;
            row.value_type = value_type.to_string();
        } else {
            rows.push(ConfigRow {
                key: key.to_string(),
                value: raw,
                value_type: value_type.to_string(),
                category: "test".to_string(),
            });
        }
        Ok(())
    }
}

/// Scenario 1: three heartbeats for the same session collapse into one
/// batch update carrying only the latest state, and the dirty set for
/// that key is empty afterward.
#[tokio::test]
async fn scenario_session_heartbeat_batch() {
    init_tracing();
    let manager = Arc::new(Manager::new());
    manager.register("sessions", Region::Object(ObjectStore::new("sessions", Policy::write_behind(1800, 10))));
    let facade = Facade::new(manager.clone());

    facade.set_session_heartbeat(42, SessionStatus::Online, "1.2.3.4");
    facade.set_session_heartbeat(42, SessionStatus::Idle, "1.2.3.4");
    facade.set_session_heartbeat(42, SessionStatus::Online, "1.2.3.5");

    let persistence = Arc::new(RecordingPersistence::default());
    let syncer = Syncer::new(manager.clone(), persistence.clone(), Arc::new(quantcache::audit::AuditBuffer::default()), Arc::new(NullMemoryMonitor));
    syncer.force_sync().await;

    let batches = persistence.session_batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0].id, 42);
    assert_eq!(batches[0][0].current_status, SessionStatus::Online);
    assert_eq!(batches[0][0].ip_address, "1.2.3.5");

    let dirty = manager.with_region("sessions", |r| r.as_object().unwrap().drain_dirty()).unwrap();
    assert!(dirty.is_empty());
}

/// Scenario 2: a config write goes through `ConfigLoader::update` (DB
/// first, then reload), `PolicyEngine` observes it immediately, and a
/// fresh `Manager`/`ConfigLoader` pair reloading against the same
/// persistence (a "restart") still sees the new value.
#[tokio::test]
async fn scenario_write_through_config_update_survives_restart() {
    init_tracing();
    let persistence = Arc::new(RecordingPersistence::default());
    persistence.config_rows.lock().unwrap().push(ConfigRow {
        key: "login_max_attempts".into(),
        value: "5".into(),
        value_type: "int".into(),
        category: "login".into(),
    });

    let manager = Arc::new(Manager::new());
    manager.register("config", Region::Object(ObjectStore::new("config", Policy::write_through(0))));
    let loader = Arc::new(ConfigLoader::new(manager.clone(), persistence.clone()));
    loader.reload().await.unwrap();

    let facade = Facade::new(manager.clone()).with_config_loader(loader.clone());
    let engine = PolicyEngine::new();
    assert_eq!(engine.get_login_policy(&facade).max_attempts, 5);

    // Scenario 2, literal: "Call facade.set_config("login_max_attempts", 10)
    // with a persister that writes to DB" — the persister writes straight
    // into the same row storage `update_config_row` would, and set_config's
    // reload afterward is what makes the new value visible.
    let persist_target = persistence.clone();
    let persister = move |value: &serde_json::Value| -> anyhow::Result<()> {
        let raw = value.as_i64().expect("login_max_attempts is an int").to_string();
        let mut rows = persist_target.config_rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.key == "login_max_attempts") {
            row.value = raw;
            row.value_type = "int".to_string();
        } else {
            rows.push(ConfigRow {
                key: "login_max_attempts".into(),
                value: raw,
                value_type: "int".into(),
                category: "login".into(),
            });
        }
        Ok(())
    };
    facade.set_config("login_max_attempts", json!(10), Some(&persister)).await;
    assert_eq!(engine.get_login_policy(&facade).max_attempts, 10);

    // "restart": a fresh region and loader, same backing persistence.
    let restarted_manager = Arc::new(Manager::new());
    restarted_manager.register("config", Region::Object(ObjectStore::new("config", Policy::write_through(0))));
    let restarted_loader = ConfigLoader::new(restarted_manager.clone(), persistence);
    restarted_loader.reload().await.unwrap();
    let restarted_facade = Facade::new(restarted_manager);
    assert_eq!(engine.get_login_policy(&restarted_facade).max_attempts, 10);
}

/// Scenario 3: Cache-Aside read-through on an empty region installs the
/// loaded value and the second call never invokes the loader again.
#[tokio::test]
async fn scenario_cache_aside_user_read_through() {
    init_tracing();
    let manager = Arc::new(Manager::new());
    manager.register("users", Region::Object(ObjectStore::new("users", Policy::cache_aside(3600))));
    let facade = Facade::new(manager);

    let calls = Arc::new(Mutex::new(0));
    let calls_inner = calls.clone();
    let loader = move || {
        *calls_inner.lock().unwrap() += 1;
        Some(json!({"id": 7, "name": "A"}))
    };

    let first = facade.get_user(7, Some(&loader));
    assert_eq!(first, Some(json!({"id": 7, "name": "A"})));
    assert_eq!(*calls.lock().unwrap(), 1);

    let second = facade.get_user(7, Some(&loader));
    assert_eq!(second, Some(json!({"id": 7, "name": "A"})));
    assert_eq!(*calls.lock().unwrap(), 1, "loader must not run again on a cache hit");
}

/// Scenario 4: password validation collects every violation, not just
/// the first, and a compliant password passes.
#[tokio::test]
async fn scenario_password_validation() {
    init_tracing();
    let manager = Arc::new(Manager::new());
    manager.register("config", Region::Object(ObjectStore::new("config", Policy::write_through(0))));
    let facade = Facade::new(manager);
    facade.set_config("password_min_length", json!(8), None).await;
    facade.set_config("password_require_digit", json!(true), None).await;
    facade.set_config("password_require_upper", json!(true), None).await;

    let engine = PolicyEngine::new();
    let err = engine.validate_password(&facade, "abc").unwrap_err();
    assert_eq!(err.0.len(), 3, "expected too-short, no-digit, no-upper: {:?}", err.0);

    assert!(engine.validate_password(&facade, "Abcdefg1").is_ok());
}

/// Scenario 5: a tight byte budget keeps `FileStore` at or under it and
/// evicts least-recently-accessed entries first.
#[tokio::test]
async fn scenario_file_store_lru_eviction() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let one_mb = 1024 * 1024;
    let store = FileStore::new("api_response", dir.path().to_path_buf(), one_mb);

    let payload = "x".repeat(100 * 1024);
    for i in 0..20 {
        store.set(&format!("key-{i}"), json!(payload), 3600).unwrap();
    }

    let stats = store.stats().unwrap();
    assert!(stats.size_mb <= 1.0, "size_mb={} exceeds budget", stats.size_mb);
    assert!(store.get("key-0", None).unwrap().is_none(), "oldest entry should have been evicted");
    assert!(store.get("key-19", None).unwrap().is_some(), "most recent entry should survive");
}

/// Scenario 6: shutdown drains exactly one final batch of the 5 dirty
/// session keys and the 7 queued audit records before the worker stops.
#[tokio::test]
async fn scenario_graceful_shutdown_drains_final_batch() {
    init_tracing();
    let manager = Arc::new(Manager::new());
    manager.register("sessions", Region::Object(ObjectStore::new("sessions", Policy::write_behind(1800, 10))));
    let facade = Facade::new(manager.clone());
    for id in 0..5 {
        facade.set_session_heartbeat(id, SessionStatus::Online, "127.0.0.1");
    }

    let audit = Arc::new(quantcache::audit::AuditBuffer::default());
    for i in 0..7 {
        audit.log(i, "login", "", "", "127.0.0.1");
    }

    let persistence = Arc::new(RecordingPersistence::default());
    let syncer = Arc::new(
        Syncer::new(manager, persistence.clone(), audit, Arc::new(NullMemoryMonitor))
            .with_sync_interval(std::time::Duration::from_secs(3600)),
    );
    let handle = syncer.clone().spawn();
    syncer.shutdown().await;
    handle.await.unwrap();

    let session_batches = persistence.session_batches.lock().unwrap();
    assert_eq!(session_batches.len(), 1);
    assert_eq!(session_batches[0].len(), 5);

    let audit_batches = persistence.audit_batches.lock().unwrap();
    assert_eq!(audit_batches.len(), 1);
    assert_eq!(audit_batches[0].len(), 7);
}
