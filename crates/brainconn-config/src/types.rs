// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `brainconn_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default parcellation: Harvard-Oxford subcortical, max-probability, 25% threshold, 2mm
pub const DEFAULT_ATLAS_NAME: &str = "harvard-oxford-sub-maxprob-thr25-2mm";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BrainconnConfig {
    pub system: SystemConfig,
    pub atlas: AtlasConfig,
    pub model: ModelConfig,
    pub artifacts: ArtifactsConfig,
    pub logging: LoggingConfig,
}

impl BrainconnConfig {
    /// Resolve a configured path: relative paths are taken from `system.data_dir`
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || self.system.data_dir.as_os_str().is_empty() {
            path.to_path_buf()
        } else {
            self.system.data_dir.join(path)
        }
    }
}

/// System-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub log_level: String,
    /// Base directory for relative paths, empty = current directory
    pub data_dir: PathBuf,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: PathBuf::from(""),
        }
    }
}

/// Atlas cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Atlas directory name inside `cache_dir`
    pub name: String,
    /// Directory holding `<name>/atlas.nii[.gz]` and `<name>/labels.txt`
    pub cache_dir: PathBuf,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_ATLAS_NAME.to_string(),
            cache_dir: PathBuf::from("atlases"),
        }
    }
}

/// Connectivity model configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub weights_path: PathBuf,
    /// Substitute seeded untrained weights when the checkpoint cannot be loaded
    pub allow_untrained_fallback: bool,
    pub untrained_seed: u64,
    /// Hidden width for untrained models
    pub hidden_dim: usize,
    /// Feature width (timepoints) for untrained models
    pub num_features: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights_path: PathBuf::from("models/connectivity_gcn.ckpt"),
            allow_untrained_fallback: false,
            untrained_seed: 42,
            hidden_dim: 64,
            num_features: None,
        }
    }
}

/// Generated artifact configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub output_dir: PathBuf,
    /// Published request directories older than this are purged
    pub ttl_secs: u64,
    pub heatmap_width: u32,
    pub heatmap_height: u32,
    /// Side length of each orthographic connectome panel
    pub connectome_panel_size: u32,
    /// Connectome edges at or above this percentile of |weight| are drawn
    pub edge_percentile: f64,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("uploads"),
            ttl_secs: 24 * 60 * 60,
            heatmap_width: 1200,
            heatmap_height: 1000,
            connectome_panel_size: 400,
            edge_percentile: 80.0,
        }
    }
}

/// Log output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enables per-run log folders when set
    pub log_dir: Option<PathBuf>,
    /// JSON console output instead of human-readable text
    pub json: bool,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            json: false,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}
