// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Figment guarantees shape and types; this pass checks value ranges that
//! serde cannot express, collecting every problem instead of stopping at
//! the first.

use thiserror::Error;

use crate::model::TollgateConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single invalid configuration value.
#[derive(Debug, Error)]
#[error("{field}: {message}")]
pub struct ConfigError {
    /// Dotted path of the offending key, e.g. `cache.sweep_batch_size`.
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a deserialized config, returning every violation found.
pub fn validate_config(config: &TollgateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::new(
            "service.log_level",
            format!(
                "unknown level {:?}, expected one of {}",
                config.service.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::new(
            "storage.database_path",
            "must not be empty",
        ));
    }
    if config.storage.io_timeout_ms == 0 {
        errors.push(ConfigError::new(
            "storage.io_timeout_ms",
            "must be at least 1",
        ));
    }
    if config.cache.default_ttl_ms == 0 {
        errors.push(ConfigError::new("cache.default_ttl_ms", "must be at least 1"));
    }
    if config.cache.sweep_batch_size == 0 {
        errors.push(ConfigError::new(
            "cache.sweep_batch_size",
            "must be at least 1",
        ));
    }
    if config.quota.idle_retention_hours == 0 {
        errors.push(ConfigError::new(
            "quota.idle_retention_hours",
            "must be at least 1",
        ));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
