//! External collaborator interfaces (spec §6).
//!
//! These are consumed, not implemented, by this crate: persistence, the
//! analytical columnar store, and a process memory probe. Trait shape
//! mirrors `storage::map_data_store::MapDataStore` (`async_trait`, errors
//! rather than panics at the boundary).

use async_trait::async_trait;

use crate::config_value::ConfigValue;

/// A batch update row for the `sessions` table (spec §6).
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    pub id: i64,
    pub last_active: i64,
    pub current_status: SessionStatus,
    pub ip_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Online,
    Idle,
    Locked,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Online => "online",
            SessionStatus::Idle => "idle",
            SessionStatus::Locked => "locked",
        }
    }
}

/// A single audit log record (spec §3, §6).
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub user_id: i64,
    pub action: String,
    pub target: String,
    pub detail: String,
    pub ip: String,
    pub created_at: i64,
}

/// A raw config row as loaded from persistence, before type parsing.
#[derive(Debug, Clone)]
pub struct ConfigRow {
    pub key: String,
    pub value: String,
    pub value_type: String,
    pub category: String,
}

/// Persistence boundary: session batch updates, audit inserts, config
/// table access. Implemented by the hosting application; out of scope
/// here (spec §1).
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn bulk_update_sessions(&self, updates: Vec<SessionUpdate>) -> anyhow::Result<()>;
    async fn bulk_insert_audit(&self, records: Vec<AuditRecord>) -> anyhow::Result<()>;
    async fn load_all_config(&self) -> anyhow::Result<Vec<ConfigRow>>;
    async fn update_config_row(&self, key: &str, value: &ConfigValue) -> anyhow::Result<()>;
}

/// Typed replacement for the original string-dispatched `query(method_name,
/// *args)` vocabulary (Design Notes). The `&str` front door in
/// `VectorStore::query_named` exists only to preserve that external API
/// shape; internally everything routes through this enum.
#[derive(Debug, Clone)]
pub enum VectorQuery {
    TopNByRank { date: String, top_n: usize },
    ByCode { code: String },
    ByCodes { codes: Vec<String> },
    History { code: String, start_date: String, end_date: String },
    IndustrySlice { industry_code: String, date: String },
    StrategyBundle { strategy: String, date: String },
}

/// Opaque result payload for a `VectorQuery`. The concrete analytical
/// store (out of scope here) fills this with whatever JSON-shaped answer
/// the query implies; this crate never interprets the contents.
#[derive(Debug, Clone)]
pub struct VectorAnswer(pub serde_json::Value);

#[derive(Debug, Clone)]
pub struct VectorStats {
    pub memory_mb: f64,
    pub rows: usize,
}

/// Read-only adapter over the external, numpy-backed columnar cache.
/// Construction of the underlying dataset is out of scope (spec §1).
pub trait VectorSource: Send + Sync {
    fn query(&self, query: VectorQuery) -> anyhow::Result<VectorAnswer>;
    fn reload(&self) -> anyhow::Result<()>;
    fn stats(&self) -> VectorStats;
}

/// Process memory query, consumed by the Syncer's GC threshold check.
pub trait MemoryMonitor: Send + Sync {
    fn virtual_memory_percent(&self) -> f64;
}

/// A `MemoryMonitor` that always reports 0% usage — never triggers
/// memory-pressure GC. Mirrors `syncer.py::_get_memory_percent`'s
/// fallback when `psutil` is unavailable.
pub struct NullMemoryMonitor;

impl MemoryMonitor for NullMemoryMonitor {
    fn virtual_memory_percent(&self) -> f64 {
        0.0
    }
}
