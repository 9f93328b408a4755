// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Tollgate control plane.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), file hierarchy lookup, environment variable
//! overrides, and a range-checking validation pass.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::TollgateConfig;
pub use validation::{ConfigError, validate_config};

/// Load configuration from the file hierarchy and validate it.
pub fn load_and_validate() -> Result<TollgateConfig, Vec<ConfigError>> {
    let config = loader::load_config().map_err(figment_error)?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<TollgateConfig, Vec<ConfigError>> {
    let config = loader::load_config_from_str(toml_content).map_err(figment_error)?;
    validation::validate_config(&config)?;
    Ok(config)
}

#[allow(clippy::result_large_err)]
fn figment_error(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter()
        .map(|e| ConfigError {
            field: e
                .path
                .join("."),
            message: e.kind.to_string(),
        })
        .collect()
}
