//! Disk-backed L2 region with a byte budget and LRU eviction (spec §4.5).
//!
//! Grounded on `store.py::FileStore` (lazy `diskcache.Cache` init, 24h
//! default TTL, 5-minute loader-fill TTL) and, for the `redb` table
//! layout and write-transaction shape, `objectio-block-gateway/src/store.rs`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use parking_lot::Mutex;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::entry::now_millis;
use crate::error::CacheError;
use crate::policy::Loader;
use crate::Value;

const VALUES: TableDefinition<&str, &[u8]> = TableDefinition::new("values");
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

const DEFAULT_TTL_SECS: u64 = 24 * 3600;
const LOADER_FILL_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileMeta {
    expire_at: i64,
    last_access: i64,
    size: u64,
}

struct Core {
    db: Database,
    /// In-memory LRU index, ordered `(last_access, key)` so the least
    /// recently used entry sorts first. Kept alongside `redb` rather than
    /// derived from a table scan on every eviction check.
    lru: BTreeMap<(i64, String), ()>,
    total_bytes: u64,
    count: u64,
}

impl Core {
    fn open(directory: &std::path::Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(directory)?;
        let db = Database::create(directory.join("filestore.redb"))?;
        let wtx = db.begin_write()?;
        wtx.open_table(VALUES)?;
        wtx.open_table(META)?;
        wtx.commit()?;

        let mut lru = BTreeMap::new();
        let mut total_bytes = 0u64;
        let mut count = 0u64;
        {
            let rtx = db.begin_read()?;
            let meta_table = rtx.open_table(META)?;
            for row in meta_table.iter()? {
                let (k, v) = row?;
                let meta: FileMeta = serde_json::from_slice(v.value())?;
                lru.insert((meta.last_access, k.value().to_string()), ());
                total_bytes += meta.size;
                count += 1;
            }
        }

        Ok(Self {
            db,
            lru,
            total_bytes,
            count,
        })
    }

    fn read_meta(&self, key: &str) -> anyhow::Result<Option<FileMeta>> {
        let rtx = self.db.begin_read()?;
        let table = rtx.open_table(META)?;
        Ok(table.get(key)?.map(|v| serde_json::from_slice(v.value())).transpose()?)
    }

    fn read_value(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let rtx = self.db.begin_read()?;
        let table = rtx.open_table(VALUES)?;
        Ok(table.get(key)?.map(|v| serde_json::from_slice(v.value())).transpose()?)
    }

    fn remove_entry(&mut self, key: &str) -> anyhow::Result<bool> {
        let existing = self.read_meta(key)?;
        let wtx = self.db.begin_write()?;
        let removed = wtx.open_table(VALUES)?.remove(key)?.is_some();
        wtx.open_table(META)?.remove(key)?;
        wtx.commit()?;
        if let Some(meta) = existing {
            self.lru.remove(&(meta.last_access, key.to_string()));
            self.total_bytes = self.total_bytes.saturating_sub(meta.size);
            self.count = self.count.saturating_sub(1);
        }
        Ok(removed)
    }

    fn touch(&mut self, key: &str, meta: &mut FileMeta) -> anyhow::Result<()> {
        self.lru.remove(&(meta.last_access, key.to_string()));
        meta.last_access = now_millis();
        self.lru.insert((meta.last_access, key.to_string()), ());
        let wtx = self.db.begin_write()?;
        wtx.open_table(META)?.insert(key, serde_json::to_vec(meta)?.as_slice())?;
        wtx.commit()?;
        Ok(())
    }

    fn write_entry(&mut self, key: &str, value: &Value, ttl_secs: u64, size_limit_bytes: u64) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(value)?;
        let size = bytes.len() as u64;
        let now = now_millis();
        let expire_at = now + (ttl_secs as i64) * 1000;
        let meta = FileMeta {
            expire_at,
            last_access: now,
            size,
        };

        if let Some(old) = self.read_meta(key)? {
            self.lru.remove(&(old.last_access, key.to_string()));
            self.total_bytes = self.total_bytes.saturating_sub(old.size);
            self.count = self.count.saturating_sub(1);
        }

        let wtx = self.db.begin_write()?;
        wtx.open_table(VALUES)?.insert(key, bytes.as_slice())?;
        wtx.open_table(META)?.insert(key, serde_json::to_vec(&meta)?.as_slice())?;
        wtx.commit()?;
        self.lru.insert((meta.last_access, key.to_string()), ());
        self.total_bytes += size;
        self.count += 1;

        self.evict_to_budget(size_limit_bytes)?;
        Ok(())
    }

    fn evict_to_budget(&mut self, size_limit_bytes: u64) -> anyhow::Result<()> {
        while self.total_bytes > size_limit_bytes {
            let Some(((_, key), ())) = self.lru.iter().next() else {
                break;
            };
            let key = key.clone();
            self.remove_entry(&key)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        let wtx = self.db.begin_write()?;
        {
            let mut values = wtx.open_table(VALUES)?;
            let mut meta = wtx.open_table(META)?;
            let keys: Vec<String> = self.lru.iter().map(|((_, k), ())| k.clone()).collect();
            for k in &keys {
                values.remove(k.as_str())?;
                meta.remove(k.as_str())?;
            }
        }
        wtx.commit()?;
        self.lru.clear();
        self.total_bytes = 0;
        self.count = 0;
        Ok(())
    }
}

/// A disk-backed region. Opened lazily: `Core::open` runs on the first
/// call into any method, not at region registration (spec §4.5).
pub struct FileStore {
    name: String,
    directory: PathBuf,
    size_limit_bytes: u64,
    core: Mutex<Option<Core>>,
}

impl FileStore {
    #[must_use]
    pub fn new(name: impl Into<String>, directory: PathBuf, size_limit_bytes: u64) -> Self {
        Self {
            name: name.into(),
            directory,
            size_limit_bytes,
            core: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn with_core<R>(&self, f: impl FnOnce(&mut Core, u64) -> anyhow::Result<R>) -> Result<R, CacheError> {
        let mut guard = self.core.lock();
        if guard.is_none() {
            let opened = Core::open(&self.directory).map_err(CacheError::StorageFailure)?;
            *guard = Some(opened);
        }
        let core = guard.as_mut().expect("just initialized");
        f(core, self.size_limit_bytes).map_err(CacheError::StorageFailure)
    }

    pub fn get(&self, key: &str, loader: Option<&Loader>) -> Result<Option<Value>, CacheError> {
        let hit = self.with_core(|core, _limit| {
            let Some(mut meta) = core.read_meta(key)? else {
                return Ok(None);
            };
            if meta.expire_at != 0 && now_millis() > meta.expire_at {
                core.remove_entry(key)?;
                return Ok(None);
            }
            let value = core.read_value(key)?;
            if value.is_some() {
                core.touch(key, &mut meta)?;
            }
            Ok(value)
        })?;

        if hit.is_some() {
            return Ok(hit);
        }

        let Some(loader) = loader else {
            return Ok(None);
        };
        let Some(value) = loader() else {
            return Ok(None);
        };
        self.set(key, value.clone(), LOADER_FILL_TTL_SECS)?;
        Ok(Some(value))
    }

    /// `ttl = 0` uses the 24-hour default; any positive value is used as-is.
    pub fn set(&self, key: &str, value: Value, ttl_secs: u64) -> Result<(), CacheError> {
        let ttl = if ttl_secs > 0 { ttl_secs } else { DEFAULT_TTL_SECS };
        self.with_core(|core, limit| core.write_entry(key, &value, ttl, limit))
    }

    pub fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.with_core(|core, _limit| core.remove_entry(key))
    }

    pub fn clear(&self) -> Result<(), CacheError> {
        self.with_core(|core, _limit| core.clear())
    }

    pub fn stats(&self) -> Result<FileStats, CacheError> {
        self.with_core(|core, _limit| {
            Ok(FileStats {
                name: self.name.clone(),
                size_mb: core.total_bytes as f64 / (1024.0 * 1024.0),
                count: core.count,
                directory: self.directory.display().to_string(),
            })
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    pub name: String,
    pub size_mb: f64,
    pub count: u64,
    pub directory: String,
}
