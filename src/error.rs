//! Error taxonomy for the caching subsystem (spec §7).
//!
//! Grounded on `service/operation.rs::OperationError`: a closed
//! `thiserror` enum for this crate's own failures, wrapping opaque
//! collaborator failures via `anyhow::Error`.

/// `BudgetExceeded` from the spec has no variant here: it is handled
/// internally by `FileStore`'s LRU eviction and is never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("region '{0}' is not registered")]
    MissingRegion(String),

    #[error("operation not supported by this store")]
    UnsupportedOperation,

    #[error("loader failed: {0}")]
    LoaderFailure(#[source] anyhow::Error),

    #[error("persister failed: {0}")]
    PersisterFailure(#[source] anyhow::Error),

    #[error("value not serializable: {0}")]
    SerializationFailure(#[source] serde_json::Error),

    #[error("config value '{key}' could not be parsed as {expected}")]
    ConfigTypeError { key: String, expected: &'static str },

    #[error("disk store failed: {0}")]
    StorageFailure(#[source] anyhow::Error),
}

/// Aggregated password-policy violations, surfaced to callers of
/// `PolicyEngine::validate_password` as a single multi-reason failure.
#[derive(Debug, thiserror::Error)]
#[error("password does not meet policy: {}", .0.join("; "))]
pub struct PasswordPolicyViolation(pub Vec<String>);
