//! Background flush loop: dirty-set drain, audit drain, memory-pressure
//! GC (spec §4.8).
//!
//! Grounded on `service/worker.rs`'s tick-loop shape and
//! `network/shutdown.rs`'s cooperative-cancellation pattern, simplified:
//! the Syncer has no in-flight-request concept, only a persistence batch
//! it always lets finish before observing the running flag again.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::audit::AuditBuffer;
use crate::collaborators::{MemoryMonitor, Persistence, SessionStatus, SessionUpdate};
use crate::entry::now_millis;
use crate::manager::Manager;
use crate::policy::DirtySet;

const SESSIONS_REGION: &str = "sessions";
const MEMORY_PRESSURE_THRESHOLD: f64 = 80.0;
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_GC_INTERVAL_SECS: i64 = 300;

pub struct Syncer {
    manager: Arc<Manager>,
    persistence: Arc<dyn Persistence>,
    audit: Arc<AuditBuffer>,
    memory_monitor: Arc<dyn MemoryMonitor>,
    sync_interval: Duration,
    gc_interval_secs: i64,
    last_gc_millis: AtomicI64,
    running: Arc<AtomicBool>,
    force: Notify,
}

impl Syncer {
    #[must_use]
    pub fn new(
        manager: Arc<Manager>,
        persistence: Arc<dyn Persistence>,
        audit: Arc<AuditBuffer>,
        memory_monitor: Arc<dyn MemoryMonitor>,
    ) -> Self {
        Self {
            manager,
            persistence,
            audit,
            memory_monitor,
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            gc_interval_secs: DEFAULT_GC_INTERVAL_SECS,
            last_gc_millis: AtomicI64::new(0),
            running: Arc::new(AtomicBool::new(false)),
            force: Notify::new(),
        }
    }

    #[must_use]
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    #[must_use]
    pub fn with_gc_interval_secs(mut self, secs: i64) -> Self {
        self.gc_interval_secs = secs;
        self
    }

    /// Spawns the background loop. Started only after every region has
    /// been registered (spec §4.8 lifecycle).
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.sync_interval);
            interval.tick().await; // first tick fires immediately; skip it
            while self.running.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = interval.tick() => {}
                    () = self.force.notified() => {}
                }
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }
                self.run_cycle().await;
            }
        })
    }

    /// Stops the loop after its current cycle and runs one final forced
    /// cycle to drain whatever accumulated since the last tick (spec
    /// §4.8: graceful shutdown must not drop the last batch).
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.force.notify_one();
        self.force_sync().await;
    }

    pub async fn force_sync(&self) {
        self.run_cycle().await;
    }

    async fn run_cycle(&self) {
        self.drain_sessions().await;
        self.drain_audit().await;
        self.maybe_gc();
    }

    /// Snapshots the dirty sessions and clears their flags before the
    /// persistence call even starts (spec §4.8 step 1). A failed batch
    /// below drops the keys rather than retrying, but the dirty flag is
    /// never left set for an entry that will never be retried.
    async fn drain_sessions(&self) {
        let Ok((dirty, snapshot)) = self.manager.with_region(SESSIONS_REGION, |r| match r.as_object() {
            Some(store) => {
                let dirty = store.drain_dirty();
                let snapshot = store.snapshot(&dirty);
                store.clear_dirty_flags(&dirty);
                (dirty, snapshot)
            }
            None => (DirtySet::new(), Vec::new()),
        }) else {
            return;
        };
        if dirty.is_empty() {
            return;
        }

        let updates: Vec<SessionUpdate> = snapshot
            .iter()
            .filter_map(|(key, value)| parse_session_update(key, value))
            .collect();

        if updates.is_empty() {
            return;
        }

        if let Err(err) = self.persistence.bulk_update_sessions(updates).await {
            error!(error = %err, "session batch sync failed, dirty keys already cleared (best-effort)");
        }
    }

    async fn drain_audit(&self) {
        let records = self.audit.flush();
        if records.is_empty() {
            return;
        }
        if let Err(err) = self.persistence.bulk_insert_audit(records).await {
            error!(error = %err, "audit batch insert failed, records lost");
        }
    }

    fn maybe_gc(&self) {
        let memory_percent = self.memory_monitor.virtual_memory_percent();
        let now = now_millis();

        if memory_percent > MEMORY_PRESSURE_THRESHOLD {
            self.manager.gc();
            self.last_gc_millis.store(now, Ordering::SeqCst);
            info!(memory_percent, reason = "memory_pressure", "gc triggered");
            return;
        }

        let last_gc = self.last_gc_millis.load(Ordering::SeqCst);
        if now - last_gc > self.gc_interval_secs * 1000 {
            self.manager.gc();
            self.last_gc_millis.store(now, Ordering::SeqCst);
            info!(reason = "scheduled", "gc triggered");
        }
    }
}

fn parse_session_update(key: &str, value: &crate::Value) -> Option<SessionUpdate> {
    let id: i64 = key.parse().ok()?;
    let status = match value.get("status")?.as_str()? {
        "online" => SessionStatus::Online,
        "idle" => SessionStatus::Idle,
        "locked" => SessionStatus::Locked,
        _ => return None,
    };
    let last_active = value.get("last_active")?.as_i64()?;
    let ip_address = value.get("ip_address")?.as_str()?.to_string();
    Some(SessionUpdate {
        id,
        last_active,
        current_status: status,
        ip_address,
    })
}
