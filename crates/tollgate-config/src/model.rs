// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tollgate control plane.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tollgate_core::types::QuotaPolicy;

/// Top-level Tollgate configuration.
///
/// Loaded from TOML files with environment variable overrides. All sections
/// are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TollgateConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Default quota policy for admission checks.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Result cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Job orchestrator settings.
    #[serde(default)]
    pub jobs: JobsConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "tollgate".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Caller-imposed timeout on every store operation, in milliseconds.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

impl StorageConfig {
    /// The configured I/O timeout as a `Duration`.
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    "tollgate.db".to_string()
}

fn default_io_timeout_ms() -> u64 {
    5000
}

/// Default quota policy applied when a caller does not supply its own caps.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Requests admitted per identifier per fixed hour window.
    #[serde(default = "default_requests_per_hour")]
    pub requests_per_hour: u32,

    /// Tokens consumable per identifier per fixed day window.
    #[serde(default = "default_tokens_per_day")]
    pub tokens_per_day: u64,

    /// Rate-limit records idle for longer than this are eligible for the
    /// retention sweep.
    #[serde(default = "default_idle_retention_hours")]
    pub idle_retention_hours: u32,
}

impl QuotaConfig {
    /// The configured caps as a [`QuotaPolicy`].
    pub fn policy(&self) -> QuotaPolicy {
        QuotaPolicy {
            requests_per_hour: self.requests_per_hour,
            tokens_per_day: self.tokens_per_day,
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            requests_per_hour: default_requests_per_hour(),
            tokens_per_day: default_tokens_per_day(),
            idle_retention_hours: default_idle_retention_hours(),
        }
    }
}

fn default_requests_per_hour() -> u32 {
    60
}

fn default_tokens_per_day() -> u64 {
    200_000
}

fn default_idle_retention_hours() -> u32 {
    720 // 30 days
}

/// Result cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Default time-to-live for stored results, in milliseconds.
    #[serde(default = "default_ttl_ms")]
    pub default_ttl_ms: u64,

    /// Maximum entries removed per expiry sweep call.
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: u32,
}

impl CacheConfig {
    /// The configured default TTL as a `TimeDelta`.
    pub fn default_ttl(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.default_ttl_ms as i64)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: default_ttl_ms(),
            sweep_batch_size: default_sweep_batch_size(),
        }
    }
}

fn default_ttl_ms() -> u64 {
    86_400_000 // 24 hours
}

fn default_sweep_batch_size() -> u32 {
    100
}

/// Job orchestrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    /// Default retry budget for jobs that do not specify their own.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_deserializes_to_defaults() {
        let config: TollgateConfig = toml::from_str("").unwrap();
        assert_eq!(config.service.name, "tollgate");
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.storage.database_path, "tollgate.db");
        assert_eq!(config.quota.requests_per_hour, 60);
        assert_eq!(config.quota.tokens_per_day, 200_000);
        assert_eq!(config.jobs.max_retries, 3);
    }

    #[test]
    fn partial_section_keeps_sibling_defaults() {
        let toml_str = r#"
[quota]
requests_per_hour = 5
"#;
        let config: TollgateConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.quota.requests_per_hour, 5);
        // Unset keys in the same section still default.
        assert_eq!(config.quota.tokens_per_day, 200_000);
        assert_eq!(config.quota.idle_retention_hours, 720);
    }

    #[test]
    fn unknown_field_in_section_is_rejected() {
        let toml_str = r#"
[cache]
default_ttl_ms = 1000
eviction_policy = "lru"
"#;
        let result = toml::from_str::<TollgateConfig>(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_top_level_section_is_rejected() {
        let result = toml::from_str::<TollgateConfig>("[billing]\nenabled = true\n");
        assert!(result.is_err());
    }
}
