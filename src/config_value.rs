//! Typed configuration values.
//!
//! Replaces the dynamically-typed config bag in the original system with a
//! tagged union, per the Design Notes: `{Int | Bool | String | Json}`.

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// A single typed config scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ConfigValue {
    Int(i64),
    Bool(bool),
    String(String),
    Json(serde_json::Value),
}

impl ConfigValue {
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Unwraps into the plain JSON scalar a cache reader expects — callers
    /// like `PolicyEngine` read config values as native ints/bools/strings,
    /// not this type's own tagged `{type, value}` encoding.
    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        match self {
            ConfigValue::Int(i) => serde_json::Value::from(i),
            ConfigValue::Bool(b) => serde_json::Value::from(b),
            ConfigValue::String(s) => serde_json::Value::from(s),
            ConfigValue::Json(v) => v,
        }
    }

    /// Parses a raw `(value, declared_type)` pair as loaded from persistence.
    /// `key` identifies the row being parsed, purely for the error message —
    /// it plays no role in parsing itself.
    ///
    /// Mirrors `config_service.py::_parse_value`. Unparseable rows yield
    /// `ConfigTypeError` so the caller (`ConfigLoader`) can drop and log.
    pub fn parse(key: &str, raw_value: &str, declared_type: &str) -> Result<Self, CacheError> {
        match declared_type {
            "int" => raw_value
                .parse::<i64>()
                .map(ConfigValue::Int)
                .map_err(|_| CacheError::ConfigTypeError {
                    key: key.to_string(),
                    expected: "int",
                }),
            "bool" => Ok(ConfigValue::Bool(matches!(
                raw_value.to_ascii_lowercase().as_str(),
                "true" | "1" | "yes"
            ))),
            "json" => serde_json::from_str(raw_value)
                .map(ConfigValue::Json)
                .map_err(|_| CacheError::ConfigTypeError {
                    key: key.to_string(),
                    expected: "json",
                }),
            _ => Ok(ConfigValue::String(raw_value.to_string())),
        }
    }
}
