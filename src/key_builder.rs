//! Canonical cache key construction (spec §4.7). A free-function module
//! rather than a class of static methods, per Rust idiom — grounded on
//! `facade.py::KeyBuilder`.

#[must_use]
pub fn session(id: i64) -> String {
    id.to_string()
}

#[must_use]
pub fn user(id: i64) -> String {
    id.to_string()
}

#[must_use]
pub fn config(key: &str) -> String {
    key.to_string()
}

#[must_use]
pub fn api(endpoint: &str, params_hash: &str) -> String {
    format!("api:{endpoint}:{params_hash}")
}

#[must_use]
pub fn report(report_type: &str, params_hash: &str) -> String {
    format!("report:{report_type}:{params_hash}")
}

#[must_use]
pub fn stock_daily(date: &str) -> String {
    format!("daily:{date}")
}

#[must_use]
pub fn stock_rank(date: &str, top_n: usize) -> String {
    format!("rank:{date}:{top_n}")
}

#[must_use]
pub fn sector_list(date: &str) -> String {
    format!("sector:{date}")
}

#[must_use]
pub fn hotspot(date: &str) -> String {
    format!("hotspot:{date}")
}

#[must_use]
pub fn signal(signal_type: &str, date: &str) -> String {
    format!("signal:{signal_type}:{date}")
}

#[must_use]
pub fn industry_jump(date: &str, days: u32) -> String {
    format!("industry_jump:{date}:{days}")
}
