//! Derives effective password/login/session policy from cached config
//! (spec §4.10). Grounded on `services/policy_engine.py`.
//!
//! Stateless: the only cross-call state is the rate-limited miss-log map,
//! mirrored here as `DashMap<&'static str, AtomicI64>` rather than
//! `RwLock<HashMap<...>>`, since only a single timestamp per key needs
//! guarding — the same lock-free-per-key shape `cluster/failure_detector.rs`
//! uses for per-node state.

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;
use tracing::warn;

use crate::entry::now_millis;
use crate::error::PasswordPolicyViolation;
use crate::facade::Facade;

const MISS_LOG_INTERVAL_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy)]
pub struct LoginPolicy {
    pub max_attempts: i64,
    pub lockout_minutes: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub max_devices: i64,
    pub access_token_hours: i64,
    pub refresh_token_days: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_length: i64,
    pub require_digit: bool,
    pub require_upper: bool,
    pub require_lower: bool,
    pub require_special: bool,
}

pub struct PolicyEngine {
    last_miss_log: DashMap<&'static str, AtomicI64>,
}

impl PolicyEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_miss_log: DashMap::new(),
        }
    }

    /// Config values live in the cache as plain JSON scalars (an int, a
    /// bool, ...) — `ConfigLoader` unwraps the tagged [`ConfigValue`] into
    /// its native JSON form before `set_direct`, so reads here don't need
    /// to know about the tagged representation.
    ///
    /// [`ConfigValue`]: crate::config_value::ConfigValue
    fn cfg_int(&self, facade: &Facade, key: &'static str, default: i64) -> i64 {
        match facade.get_config(key, None).and_then(|v| v.as_i64()) {
            Some(v) => v,
            None => {
                self.log_miss_once(key, default);
                default
            }
        }
    }

    fn cfg_bool(&self, facade: &Facade, key: &'static str, default: bool) -> bool {
        match facade.get_config(key, None).and_then(|v| v.as_bool()) {
            Some(v) => v,
            None => {
                self.log_miss_once(key, default);
                default
            }
        }
    }

    fn log_miss_once(&self, key: &'static str, default: impl std::fmt::Debug) {
        let now = now_millis();
        let entry = self
            .last_miss_log
            .entry(key)
            .or_insert_with(|| AtomicI64::new(0));
        let last = entry.load(Ordering::Relaxed);
        if now - last > MISS_LOG_INTERVAL_MS {
            warn!(key, ?default, "config cache miss, using default; check preload");
            entry.store(now, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn get_login_policy(&self, facade: &Facade) -> LoginPolicy {
        LoginPolicy {
            max_attempts: self.cfg_int(facade, "login_max_attempts", 5),
            lockout_minutes: self.cfg_int(facade, "login_lockout_minutes", 30),
        }
    }

    /// `allowed_devices` is the user's per-account override; a positive
    /// value wins over the global `session_max_devices` default.
    #[must_use]
    pub fn get_session_policy(&self, facade: &Facade, allowed_devices: Option<i64>) -> SessionPolicy {
        let global_max = self.cfg_int(facade, "session_max_devices", 3);
        let max_devices = allowed_devices.filter(|d| *d > 0).unwrap_or(global_max);
        SessionPolicy {
            max_devices,
            access_token_hours: self.cfg_int(facade, "session_access_token_hours", 24),
            refresh_token_days: self.cfg_int(facade, "session_refresh_token_days", 7),
        }
    }

    #[must_use]
    pub fn get_password_policy(&self, facade: &Facade) -> PasswordPolicy {
        PasswordPolicy {
            min_length: self.cfg_int(facade, "password_min_length", 6),
            require_digit: self.cfg_bool(facade, "password_require_digit", false),
            require_upper: self.cfg_bool(facade, "password_require_upper", false),
            require_lower: self.cfg_bool(facade, "password_require_lower", false),
            require_special: self.cfg_bool(facade, "password_require_special", false),
        }
    }

    pub fn validate_password(&self, facade: &Facade, password: &str) -> Result<(), PasswordPolicyViolation> {
        let policy = self.get_password_policy(facade);
        let mut errors = Vec::new();

        if (password.chars().count() as i64) < policy.min_length {
            errors.push(format!("password must be at least {} characters", policy.min_length));
        }
        if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("password must contain a digit".to_string());
        }
        if policy.require_upper && !password.chars().any(|c| c.is_uppercase()) {
            errors.push("password must contain an uppercase letter".to_string());
        }
        if policy.require_lower && !password.chars().any(|c| c.is_lowercase()) {
            errors.push("password must contain a lowercase letter".to_string());
        }
        if policy.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
            errors.push("password must contain a special character".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PasswordPolicyViolation(errors))
        }
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}
