// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # brainconn - functional connectivity from brain scans
//!
//! Takes a 4D functional scan (NIfTI-1, `.nii` or `.nii.gz`), averages it
//! inside the regions of an anatomical atlas, correlates the region time
//! courses into a graph and runs a graph convolutional network over it. The
//! result is a symmetric region x region connectivity matrix plus summary
//! metrics, a heatmap, a connectome rendering and a CSV connection table.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! brainconn = "0.1"  # Default: full pipeline
//! ```
//!
//! ```rust,no_run
//! use brainconn::prelude::*;
//! use std::path::Path;
//!
//! let config = load_config_or_default(None, None)?;
//! let pipeline = ConnectivityPipeline::from_config(&config)?;
//!
//! let output = pipeline.process(Path::new("sub-01_task-rest_bold.nii.gz"))?;
//! println!("mean connectivity {:.3}", output.metrics.mean_connectivity);
//! for handle in &output.artifacts.published {
//!     println!("{:?} -> {}", handle.kind, handle.path.display());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`pipeline`** (default): extraction, graph, model, artifacts, config
//! - **`observability`**: `tracing` subscriber setup with per-crate debug flags
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: brainconn-structures, brainconn-config     │
//! │  (Scan, LabelVolume, ConnectivityMatrix, errors)        │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  I/O: brainconn-io, brainconn-serialization             │
//! │  (NIfTI volumes, model checkpoints)                     │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Algorithms: brainconn-connectivity                     │
//! │  (atlas → time series → graph → GCN → matrix)           │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Output: brainconn-artifacts                            │
//! │  (heatmap, connectome, CSV, per-request directories)    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use brainconn_io as io;
pub use brainconn_serialization as serialization;
pub use brainconn_structures as structures;

#[cfg(feature = "pipeline")]
pub use brainconn_config as config;

// Re-export algorithms
#[cfg(feature = "pipeline")]
pub use brainconn_artifacts as artifacts;

#[cfg(feature = "pipeline")]
pub use brainconn_connectivity as connectivity;

// Re-export infrastructure
#[cfg(feature = "observability")]
pub use brainconn_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::io::{load_label_volume, load_scan};
    pub use crate::serialization::{load_checkpoint, save_checkpoint, GcnCheckpoint, GcnShape};
    pub use crate::structures::{
        Affine, ConnectionTable, ConnectivityError, ConnectivityMatrix, ConnectivityResult,
        ErrorKind, LabelVolume, RegionTimeSeries, Scan,
    };

    #[cfg(feature = "pipeline")]
    pub use crate::artifacts::{ArtifactKind, ArtifactReport, ArtifactStore, RenderOptions};

    #[cfg(feature = "pipeline")]
    pub use crate::config::{load_config, load_config_or_default, BrainconnConfig};

    #[cfg(feature = "pipeline")]
    pub use crate::connectivity::{
        Atlas, AtlasProvider, ConnectivityMetrics, ConnectivityModel, ConnectivityPipeline,
        LocalAtlasProvider, PipelineOutput,
    };

    #[cfg(feature = "observability")]
    pub use crate::observability::{init_logging, CrateDebugFlags, LoggingOptions};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
