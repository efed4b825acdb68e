//! Read-only analytical region wrapping an external columnar data source
//! (spec §4.4). Grounded on `store.py::VectorStore`; `get`/`set`/`delete`
//! are intentionally absent (callers route through [`VectorStore::query`]).

use std::sync::Arc;

use crate::collaborators::{VectorAnswer, VectorQuery, VectorSource, VectorStats};

pub struct VectorStore {
    name: String,
    source: Arc<dyn VectorSource>,
}

impl VectorStore {
    #[must_use]
    pub fn new(name: impl Into<String>, source: Arc<dyn VectorSource>) -> Self {
        Self {
            name: name.into(),
            source,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query(&self, query: VectorQuery) -> anyhow::Result<VectorAnswer> {
        self.source.query(query)
    }

    /// String-keyed front door preserved from the original `query(method_name,
    /// *args)` API surface; forwards into the typed `query` dispatch table.
    /// Unknown names return `Err` rather than the original's `AttributeError`.
    pub fn query_named(&self, method_name: &str, args: VectorQueryArgs) -> anyhow::Result<VectorAnswer> {
        let query = match (method_name, args) {
            ("get_top_n_by_rank", VectorQueryArgs::TopN { date, top_n }) => {
                VectorQuery::TopNByRank { date, top_n }
            }
            ("get_stock_by_code", VectorQueryArgs::Code { code }) => VectorQuery::ByCode { code },
            ("get_stocks_by_codes", VectorQueryArgs::Codes { codes }) => VectorQuery::ByCodes { codes },
            ("get_history", VectorQueryArgs::History { code, start_date, end_date }) => {
                VectorQuery::History { code, start_date, end_date }
            }
            ("get_industry_slice", VectorQueryArgs::IndustrySlice { industry_code, date }) => {
                VectorQuery::IndustrySlice { industry_code, date }
            }
            ("get_strategy_bundle", VectorQueryArgs::StrategyBundle { strategy, date }) => {
                VectorQuery::StrategyBundle { strategy, date }
            }
            (other, _) => anyhow::bail!("method {other} not found in vector source"),
        };
        self.query(query)
    }

    pub fn reload(&self) -> anyhow::Result<()> {
        self.source.reload()
    }

    #[must_use]
    pub fn stats(&self) -> VectorStats {
        self.source.stats()
    }
}

/// Argument bundle for [`VectorStore::query_named`], one variant per
/// recognized method name.
pub enum VectorQueryArgs {
    TopN { date: String, top_n: usize },
    Code { code: String },
    Codes { codes: Vec<String> },
    History { code: String, start_date: String, end_date: String },
    IndustrySlice { industry_code: String, date: String },
    StrategyBundle { strategy: String, date: String },
}
