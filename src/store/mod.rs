//! Storage engines: `ObjectStore` (in-memory + policy), `VectorStore`
//! (read-only analytical adapter), `FileStore` (disk-backed LRU).

pub mod file_store;
pub mod object_store;
pub mod vector_store;

use serde::Serialize;

pub use file_store::FileStore;
pub use object_store::{ObjectStats, ObjectStore};
pub use vector_store::VectorStore;

use crate::collaborators::VectorStats;
use crate::error::CacheError;
use crate::policy::{Loader, Persister};
use crate::Value;

/// Stats payload shared across the three engine kinds, shaped to match
/// what `Manager::stats` serializes per region (spec §4.6).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RegionStats {
    Object(ObjectStats),
    Vector {
        name: String,
        memory_mb: f64,
        rows: usize,
    },
    Disk {
        name: String,
        size_mb: f64,
        count: u64,
        directory: String,
    },
}

impl From<(String, VectorStats)> for RegionStats {
    fn from((name, s): (String, VectorStats)) -> Self {
        RegionStats::Vector {
            name,
            memory_mb: s.memory_mb,
            rows: s.rows,
        }
    }
}

/// A single named bucket in the `Manager` registry. Exactly one storage
/// engine backs it; object regions additionally carry a `Policy`.
pub enum Region {
    Object(ObjectStore),
    Vector(VectorStore),
    File(FileStore),
}

impl Region {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Region::Object(s) => s.name(),
            Region::Vector(s) => s.name(),
            Region::File(s) => s.name(),
        }
    }

    /// `get` is only meaningful for `Object` and `File` regions; `Vector`
    /// regions are queried exclusively through `VectorStore::query`.
    pub fn get(&self, key: &str, loader: Option<&Loader>) -> Result<Option<Value>, CacheError> {
        match self {
            Region::Object(s) => Ok(s.get(key, loader)),
            Region::File(s) => s.get(key, loader),
            Region::Vector(_) => Err(CacheError::UnsupportedOperation),
        }
    }

    pub fn set(&self, key: &str, value: Value, persister: Option<&Persister>) -> Result<(), CacheError> {
        match self {
            Region::Object(s) => s.set(key, value, persister).map_err(CacheError::PersisterFailure),
            Region::File(s) => s.set(key, value, 0),
            Region::Vector(_) => Err(CacheError::UnsupportedOperation),
        }
    }

    pub fn delete(&self, key: &str) -> Result<bool, CacheError> {
        match self {
            Region::Object(s) => Ok(s.delete(key)),
            Region::File(s) => s.delete(key),
            Region::Vector(_) => Err(CacheError::UnsupportedOperation),
        }
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Region::Object(_))
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectStore> {
        match self {
            Region::Object(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_vector(&self) -> Option<&VectorStore> {
        match self {
            Region::Vector(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_file(&self) -> Option<&FileStore> {
        match self {
            Region::File(s) => Some(s),
            _ => None,
        }
    }
}
