// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! consistent and within valid ranges.

use crate::{BrainconnConfig, ConfigError, ConfigResult};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
    OutOfRange { field: String, value: f64, min: f64, max: f64 },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => {
                write!(
                    f,
                    "{} = {} is outside valid range [{}, {})",
                    field, value, min, max
                )
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Required fields
/// - Valid value ranges
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &BrainconnConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_required_fields(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_required_fields(config: &BrainconnConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.atlas.name.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "atlas.name".to_string(),
        });
    }
    if config.atlas.cache_dir.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "atlas.cache_dir".to_string(),
        });
    }
    if config.model.weights_path.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "model.weights_path".to_string(),
        });
    }
    if config.artifacts.output_dir.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "artifacts.output_dir".to_string(),
        });
    }
}

fn validate_value_ranges(config: &BrainconnConfig, errors: &mut Vec<ConfigValidationError>) {
    if !LOG_LEVELS.contains(&config.system.log_level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "system.log_level".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                config.system.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.model.hidden_dim == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "model.hidden_dim".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    if config.model.num_features == Some(0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "model.num_features".to_string(),
            reason: "must be greater than 0 when set".to_string(),
        });
    }

    if config.artifacts.ttl_secs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "artifacts.ttl_secs".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    for (field, value) in [
        ("artifacts.heatmap_width", config.artifacts.heatmap_width),
        ("artifacts.heatmap_height", config.artifacts.heatmap_height),
        (
            "artifacts.connectome_panel_size",
            config.artifacts.connectome_panel_size,
        ),
    ] {
        if !(64..=8192).contains(&value) {
            errors.push(ConfigValidationError::OutOfRange {
                field: field.to_string(),
                value: value as f64,
                min: 64.0,
                max: 8193.0,
            });
        }
    }
    let percentile = config.artifacts.edge_percentile;
    if !percentile.is_finite() || !(0.0..100.0).contains(&percentile) {
        errors.push(ConfigValidationError::OutOfRange {
            field: "artifacts.edge_percentile".to_string(),
            value: percentile,
            min: 0.0,
            max: 100.0,
        });
    }

    if config.logging.retention_runs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.retention_runs".to_string(),
            reason: "must keep at least one run".to_string(),
        });
    }
}
