// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! brainconn command-line front end
//!
//! Argument parsing, configuration layering and the JSON documents printed
//! by each subcommand. `main.rs` only wires these together.

use anyhow::{Context, Result};
use brainconn_artifacts::{ArtifactFailure, ArtifactHandle, ArtifactStore, PurgeReport};
use brainconn_config::{load_config_or_default, BrainconnConfig};
use brainconn_connectivity::{
    AtlasProvider, ConnectivityMetrics, ConnectivityModel, ConnectivityPipeline,
    LocalAtlasProvider, PipelineOutput,
};
use brainconn_observability::{LogFormat, LoggingOptions};
use brainconn_serialization::{
    load_checkpoint, save_checkpoint, CheckpointMetadata, CheckpointResult, GcnShape,
};
use brainconn_structures::{
    ConnectionTable, ConnectivityError, ConnectivityMatrix, ConnectivityResult, ErrorKind,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

pub mod output;

pub use output::{print_json, ErrorResponse};

/// Functional connectivity from 4D NIfTI brain scans
#[derive(Parser, Debug)]
#[command(name = "brainconn", version, author, long_about = None)]
#[command(after_help = "Per-crate debug logging: --debug-all or --debug-<crate>, see BRAINCONN_DEBUG")]
pub struct Cli {
    /// Configuration file (default: search for brainconn_configuration.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Write per-run log folders under this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// JSON console logs
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the connectivity matrix and artifacts for one scan
    Process {
        /// Scan file (.nii or .nii.gz)
        scan: PathBuf,

        /// Use seeded untrained weights when the checkpoint cannot be loaded
        #[arg(long, default_value_t = false)]
        allow_untrained: bool,

        /// Indent the JSON output
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Write a seeded untrained checkpoint
    InitWeights {
        /// Timepoints per scan (model input width)
        #[arg(long)]
        timepoints: usize,

        /// Number of regions (default: regions in the configured atlas)
        #[arg(long)]
        regions: Option<usize>,

        /// Hidden width (default: model.hidden_dim)
        #[arg(long)]
        hidden_dim: Option<usize>,

        /// RNG seed (default: model.untrained_seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Output path (default: model.weights_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a checkpoint's shape and metadata
    InspectWeights {
        checkpoint: PathBuf,
    },

    /// Delete expired request directories and stale staging directories
    PurgeArtifacts,
}

/// Split `--debug-*` flags (handled by the logging layer) from clap arguments
pub fn split_debug_args<I>(args: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = String>,
{
    args.into_iter().partition(|arg| arg.starts_with("--debug-"))
}

impl Cli {
    /// Override map understood by `brainconn_config::apply_cli_overrides`
    pub fn config_overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(level) = &self.log_level {
            overrides.insert("log_level".to_string(), level.clone());
        }
        if let Some(dir) = &self.log_dir {
            overrides.insert("log_dir".to_string(), dir.display().to_string());
        }
        if self.log_json {
            overrides.insert("log_json".to_string(), "true".to_string());
        }
        if let Command::Process {
            allow_untrained: true,
            ..
        } = self.command
        {
            overrides.insert("allow_untrained".to_string(), "true".to_string());
        }
        overrides
    }

    /// File, environment, then command-line configuration
    pub fn load_config(&self) -> Result<BrainconnConfig> {
        let overrides = self.config_overrides();
        load_config_or_default(self.config.as_deref(), Some(&overrides))
            .context("Failed to load configuration")
    }
}

/// Logging options derived from the loaded configuration
pub fn logging_options(config: &BrainconnConfig) -> LoggingOptions {
    LoggingOptions {
        level: config.system.log_level.clone(),
        format: if config.logging.json {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        log_dir: config
            .logging
            .log_dir
            .as_ref()
            .map(|dir| config.resolve_path(dir)),
        retention_days: config.logging.retention_days,
        retention_runs: config.logging.retention_runs,
    }
}

/// `metrics` object: summary statistics plus the connection table
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub summary: ConnectivityMetrics,
    pub connection_table: ConnectionTable,
}

/// Document printed by `process` on success
#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    pub message: String,
    pub request_id: Uuid,
    pub filename: String,
    pub connectivity_matrix: ConnectivityMatrix,
    pub region_names: Vec<String>,
    pub metrics: MetricsResponse,
    pub artifacts: Vec<ArtifactHandle>,
    pub artifact_failures: Vec<ArtifactFailure>,
}

impl ProcessResponse {
    pub fn new(scan_path: &Path, output: PipelineOutput) -> Self {
        let filename = scan_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            message: "File processed successfully".to_string(),
            request_id: output.request_id,
            filename,
            connectivity_matrix: output.matrix,
            region_names: output.region_names,
            metrics: MetricsResponse {
                summary: output.metrics,
                connection_table: output.connection_table,
            },
            artifacts: output.artifacts.published,
            artifact_failures: output.artifacts.failures,
        }
    }
}

/// Build the pipeline from `config` and process one scan
pub fn run_process(config: &BrainconnConfig, scan: &Path) -> ConnectivityResult<ProcessResponse> {
    let pipeline = ConnectivityPipeline::from_config(config)?;
    let output = pipeline.process(scan)?;
    Ok(ProcessResponse::new(scan, output))
}

/// Options for [`run_init_weights`]; `None` falls back to configuration
#[derive(Debug, Clone, Default)]
pub struct InitWeightsOptions {
    pub timepoints: usize,
    pub regions: Option<usize>,
    pub hidden_dim: Option<usize>,
    pub seed: Option<u64>,
    pub output: Option<PathBuf>,
}

/// Document printed by `init-weights`
#[derive(Debug, Clone, Serialize)]
pub struct InitWeightsReport {
    pub path: PathBuf,
    pub shape: GcnShape,
    pub seed: u64,
    pub region_names: Vec<String>,
}

/// Write a seeded untrained checkpoint.
///
/// Regions and their names come from the configured atlas unless a region
/// count is given explicitly.
pub fn run_init_weights(
    config: &BrainconnConfig,
    options: &InitWeightsOptions,
) -> Result<InitWeightsReport> {
    let (num_regions, region_names) = match options.regions {
        Some(regions) => (regions, Vec::new()),
        None => {
            let provider = LocalAtlasProvider::new(
                config.resolve_path(&config.atlas.cache_dir),
                &config.atlas.name,
            );
            let atlas = provider
                .get_atlas()
                .context("Failed to load atlas for region count (pass --regions to skip)")?;
            (atlas.num_regions(), atlas.region_names())
        }
    };
    let shape = GcnShape {
        num_regions,
        num_features: options.timepoints,
        hidden_dim: options.hidden_dim.unwrap_or(config.model.hidden_dim),
    };
    let seed = options.seed.unwrap_or(config.model.untrained_seed);
    let path = options
        .output
        .clone()
        .unwrap_or_else(|| config.resolve_path(&config.model.weights_path));

    let model = ConnectivityModel::untrained(shape, seed)?.with_region_names(region_names.clone());
    let metadata = CheckpointMetadata {
        description: format!(
            "untrained GCN, {} regions x {} timepoints, hidden {}",
            shape.num_regions, shape.num_features, shape.hidden_dim
        ),
        source: format!("untrained: seed {}", seed),
        ..CheckpointMetadata::default()
    };
    let checkpoint = model.to_checkpoint(metadata)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    save_checkpoint(&checkpoint, &path)
        .with_context(|| format!("Failed to write checkpoint {}", path.display()))?;
    info!(
        target: "brainconn-cli",
        "Wrote untrained checkpoint {} ({:?}, seed {})",
        path.display(),
        shape,
        seed
    );

    Ok(InitWeightsReport {
        path,
        shape,
        seed,
        region_names,
    })
}

/// Document printed by `inspect-weights`
#[derive(Debug, Clone, Serialize)]
pub struct WeightsSummary {
    pub path: PathBuf,
    pub version: u32,
    pub shape: GcnShape,
    pub parameters: usize,
    pub region_names: Vec<String>,
    pub metadata: CheckpointMetadata,
}

pub fn run_inspect_weights(path: &Path) -> Result<WeightsSummary> {
    let checkpoint = load_checkpoint(path)
        .with_context(|| format!("Failed to load checkpoint {}", path.display()))?;
    let parameters = [
        &checkpoint.conv1_weight,
        &checkpoint.conv1_bias,
        &checkpoint.conv2_weight,
        &checkpoint.conv2_bias,
        &checkpoint.fc_weight,
        &checkpoint.fc_bias,
    ]
    .iter()
    .map(|tensor| tensor.element_count())
    .sum::<CheckpointResult<usize>>()?;

    Ok(WeightsSummary {
        path: path.to_path_buf(),
        version: checkpoint.version,
        shape: checkpoint.shape,
        parameters,
        region_names: checkpoint.region_names,
        metadata: checkpoint.metadata,
    })
}

/// Apply the artifact expiry policy from `config`
pub fn run_purge(config: &BrainconnConfig) -> ConnectivityResult<PurgeReport> {
    let store = ArtifactStore::new(
        config.resolve_path(&config.artifacts.output_dir),
        Duration::from_secs(config.artifacts.ttl_secs),
    )?;
    store.purge_expired()
}

impl From<&ConnectivityError> for ErrorResponse {
    fn from(error: &ConnectivityError) -> Self {
        ErrorResponse {
            error: error.message().to_string(),
            kind: Some(error.kind()),
        }
    }
}

/// Kind of a top-level error, when it is a pipeline error
pub fn error_kind(error: &anyhow::Error) -> Option<ErrorKind> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ConnectivityError>())
        .map(ConnectivityError::kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_debug_args() {
        let args = [
            "brainconn",
            "--debug-brainconn-io",
            "process",
            "scan.nii",
            "--debug-all",
        ]
        .map(String::from);
        let (debug, rest) = split_debug_args(args);

        assert_eq!(debug, vec!["--debug-brainconn-io", "--debug-all"]);
        assert_eq!(rest, vec!["brainconn", "process", "scan.nii"]);
    }

    #[test]
    fn test_overrides_from_flags() {
        let cli = Cli::try_parse_from([
            "brainconn",
            "--log-level",
            "debug",
            "process",
            "scan.nii.gz",
            "--allow-untrained",
        ])
        .unwrap();
        let overrides = cli.config_overrides();

        assert_eq!(overrides.get("log_level").map(String::as_str), Some("debug"));
        assert_eq!(overrides.get("allow_untrained").map(String::as_str), Some("true"));
        assert!(!overrides.contains_key("log_dir"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["brainconn", "purge-artifacts", "--log-json"]).unwrap();
        assert!(cli.log_json);
        assert!(matches!(cli.command, Command::PurgeArtifacts));
    }

    #[test]
    fn test_init_weights_requires_timepoints() {
        assert!(Cli::try_parse_from(["brainconn", "init-weights"]).is_err());
        let cli = Cli::try_parse_from(["brainconn", "init-weights", "--timepoints", "120"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::InitWeights { timepoints: 120, regions: None, .. }
        ));
    }

    #[test]
    fn test_error_kind_from_chain() {
        let err = anyhow::Error::new(ConnectivityError::Model("bad weights".into()))
            .context("Failed to build pipeline");
        assert_eq!(error_kind(&err), Some(ErrorKind::Model));
        assert_eq!(error_kind(&anyhow::anyhow!("plain")), None);
    }
}
