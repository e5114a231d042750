//! Engine configuration.
//!
//! Loaded from `WAREFLOW_*` environment variables; anything missing or
//! malformed falls back to its default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use wareflow_approvals::DEFAULT_MIN_REJECTION_REASON_LEN;

use crate::store::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

pub const ENV_MIN_REJECTION_REASON_LEN: &str = "WAREFLOW_MIN_REJECTION_REASON_LEN";
pub const ENV_DEFAULT_PAGE_SIZE: &str = "WAREFLOW_DEFAULT_PAGE_SIZE";
pub const ENV_MAX_PAGE_SIZE: &str = "WAREFLOW_MAX_PAGE_SIZE";
pub const ENV_LOCK_TIMEOUT_MS: &str = "WAREFLOW_LOCK_TIMEOUT_MS";

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Trimmed characters a rejection reason must have.
    pub min_rejection_reason_len: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// How long an operation waits for its lock set before giving up.
    pub lock_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_rejection_reason_len: DEFAULT_MIN_REJECTION_REASON_LEN,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: core::str::FromStr + core::fmt::Display + Copy,
{
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, default = %default, "invalid configuration value; using default");
            default
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let max_page_size = parse_or(&lookup, ENV_MAX_PAGE_SIZE, defaults.max_page_size).max(1);
        let default_page_size = parse_or(&lookup, ENV_DEFAULT_PAGE_SIZE, defaults.default_page_size)
            .clamp(1, max_page_size);
        let lock_timeout_ms = parse_or(&lookup, ENV_LOCK_TIMEOUT_MS, defaults.lock_timeout.as_millis() as u64);

        Self {
            min_rejection_reason_len: parse_or(
                &lookup,
                ENV_MIN_REJECTION_REASON_LEN,
                defaults.min_rejection_reason_len,
            ),
            default_page_size,
            max_page_size,
            lock_timeout: Duration::from_millis(lock_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.min_rejection_reason_len, 10);
        assert_eq!(config.lock_timeout, Duration::from_secs(5));
    }

    #[test]
    fn values_are_read_and_bad_ones_ignored() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_MIN_REJECTION_REASON_LEN, " 20 "),
            (ENV_DEFAULT_PAGE_SIZE, "many"),
            (ENV_LOCK_TIMEOUT_MS, "250"),
        ]));
        assert_eq!(config.min_rejection_reason_len, 20);
        assert_eq!(config.default_page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
    }

    #[test]
    fn default_page_size_never_exceeds_max() {
        let config = EngineConfig::from_lookup(lookup(&[(ENV_MAX_PAGE_SIZE, "20"), (ENV_DEFAULT_PAGE_SIZE, "80")]));
        assert_eq!(config.max_page_size, 20);
        assert_eq!(config.default_page_size, 20);
    }
}
