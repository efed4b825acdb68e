//! Bulk-loads the `config` region from persistence (spec §4.11).
//!
//! Grounded on `services/config_service.py::_load_cache` for the
//! bulk-load shape, `config_value.rs::ConfigValue::parse` for per-row
//! type coercion.

use std::sync::Arc;

use tracing::{info, warn};

use crate::collaborators::Persistence;
use crate::config_value::ConfigValue;
use crate::manager::Manager;

const CONFIG_REGION: &str = "config";

pub struct ConfigLoader {
    manager: Arc<Manager>,
    persistence: Arc<dyn Persistence>,
}

impl ConfigLoader {
    #[must_use]
    pub fn new(manager: Arc<Manager>, persistence: Arc<dyn Persistence>) -> Self {
        Self { manager, persistence }
    }

    /// Reads every config row, parses it per its declared type, and
    /// writes it straight into the config region via `set_direct` (TTL=0,
    /// Write-Through) — unparseable rows are logged and dropped rather
    /// than failing the whole reload.
    pub async fn reload(&self) -> anyhow::Result<usize> {
        let rows = self.persistence.load_all_config().await?;
        let mut loaded = 0;

        self.manager.with_region(CONFIG_REGION, |region| {
            let Some(store) = region.as_object() else {
                return;
            };
            for row in &rows {
                match ConfigValue::parse(&row.key, &row.value, &row.value_type) {
                    Ok(value) => {
                        store.set_direct(&row.key, value.into_json(), Some(0));
                        loaded += 1;
                    }
                    Err(err) => {
                        warn!(key = %row.key, error = %err, "dropping unparseable config row");
                    }
                }
            }
        })?;

        info!(loaded, total = rows.len(), "config region reloaded");
        Ok(loaded)
    }

    /// Writes the new value to persistence first, then reloads the whole
    /// config region — the pair must never be reordered, so the cache
    /// never observes a value the database hasn't committed yet
    /// (spec §4.11: "(a) write to DB, (b) reload cache").
    pub async fn update(&self, key: &str, value: &ConfigValue) -> anyhow::Result<()> {
        self.persistence.update_config_row(key, value).await?;
        self.reload().await?;
        Ok(())
    }
}
