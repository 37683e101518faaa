// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{validate_config, BrainconnConfig, ConfigError, ConfigResult};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file name searched for when no explicit path is given
pub const CONFIG_FILE_NAME: &str = "brainconn_configuration.toml";

/// Find the brainconn configuration file
///
/// Search order:
/// 1. `BRAINCONN_CONFIG_PATH` environment variable
/// 2. Current working directory: `./brainconn_configuration.toml`
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("BRAINCONN_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by BRAINCONN_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "brainconn configuration file '{}' not found in any of these locations:\n{}\n\nSet BRAINCONN_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<BrainconnConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;
    let config: BrainconnConfig = toml::from_str(&content)?;

    finish(config, cli_args)
}

/// Like [`load_config`], but starts from built-in defaults when no file is found
///
/// An explicit `config_path` that does not exist is still an error.
pub fn load_config_or_default(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<BrainconnConfig> {
    if config_path.is_some() {
        return load_config(config_path, cli_args);
    }
    match find_config_file() {
        Ok(path) => load_config(Some(&path), cli_args),
        Err(ConfigError::FileNotFound(_)) if env::var("BRAINCONN_CONFIG_PATH").is_err() => {
            finish(BrainconnConfig::default(), cli_args)
        }
        Err(e) => Err(e),
    }
}

fn finish(
    mut config: BrainconnConfig,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<BrainconnConfig> {
    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    validate_config(&config)?;
    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `BRAINCONN_DATA_DIR` -> `system.data_dir`
/// - `BRAINCONN_LOG_LEVEL` -> `system.log_level`
/// - `BRAINCONN_ATLAS_DIR` -> `atlas.cache_dir`
/// - `BRAINCONN_ATLAS_NAME` -> `atlas.name`
/// - `BRAINCONN_MODEL_PATH` -> `model.weights_path`
/// - `BRAINCONN_ALLOW_UNTRAINED` -> `model.allow_untrained_fallback`
/// - `BRAINCONN_OUTPUT_DIR` -> `artifacts.output_dir`
/// - `BRAINCONN_ARTIFACT_TTL_SECS` -> `artifacts.ttl_secs`
/// - `BRAINCONN_LOG_DIR` -> `logging.log_dir`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut BrainconnConfig) {
    if let Ok(value) = env::var("BRAINCONN_DATA_DIR") {
        config.system.data_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("BRAINCONN_LOG_LEVEL") {
        config.system.log_level = value;
    }

    if let Ok(value) = env::var("BRAINCONN_ATLAS_DIR") {
        config.atlas.cache_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("BRAINCONN_ATLAS_NAME") {
        config.atlas.name = value;
    }

    if let Ok(value) = env::var("BRAINCONN_MODEL_PATH") {
        config.model.weights_path = PathBuf::from(value);
    }
    if let Ok(value) = env::var("BRAINCONN_ALLOW_UNTRAINED") {
        config.model.allow_untrained_fallback = parse_flag(&value);
    }

    if let Ok(value) = env::var("BRAINCONN_OUTPUT_DIR") {
        config.artifacts.output_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("BRAINCONN_ARTIFACT_TTL_SECS") {
        if let Ok(ttl) = value.parse::<u64>() {
            config.artifacts.ttl_secs = ttl;
        }
    }

    if let Ok(value) = env::var("BRAINCONN_LOG_DIR") {
        config.logging.log_dir = Some(PathBuf::from(value));
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"weights_path": "model.ckpt", "log_level": "debug"}`)
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when a numeric override does not parse.
/// Unknown keys are ignored.
pub fn apply_cli_overrides(
    config: &mut BrainconnConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }
    if let Some(value) = cli_args.get("data_dir") {
        config.system.data_dir = PathBuf::from(value);
    }

    if let Some(value) = cli_args.get("atlas_dir") {
        config.atlas.cache_dir = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("atlas_name") {
        config.atlas.name = value.clone();
    }

    if let Some(value) = cli_args.get("weights_path") {
        config.model.weights_path = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("allow_untrained") {
        config.model.allow_untrained_fallback = parse_flag(value);
    }
    if let Some(value) = cli_args.get("untrained_seed") {
        config.model.untrained_seed = parse_number("untrained_seed", value)?;
    }
    if let Some(value) = cli_args.get("hidden_dim") {
        config.model.hidden_dim = parse_number("hidden_dim", value)?;
    }
    if let Some(value) = cli_args.get("num_features") {
        config.model.num_features = Some(parse_number("num_features", value)?);
    }

    if let Some(value) = cli_args.get("output_dir") {
        config.artifacts.output_dir = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("ttl_secs") {
        config.artifacts.ttl_secs = parse_number("ttl_secs", value)?;
    }

    if let Some(value) = cli_args.get("log_dir") {
        config.logging.log_dir = Some(PathBuf::from(value));
    }
    if let Some(value) = cli_args.get("log_json") {
        config.logging.json = parse_flag(value);
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} = '{}' is not a number", key, value)))
}
