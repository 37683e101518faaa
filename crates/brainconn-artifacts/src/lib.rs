// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # brainconn-artifacts
//!
//! Turns a connectivity matrix into client-facing files:
//! - `connectivity_matrix.png`: coolwarm heatmap with colour bar
//! - `connectome.png`: sagittal, coronal and axial node/edge projections
//! - `connection_strengths.csv`: one row per unordered region pair
//!
//! Files are written through an [`ArtifactStore`], which keys every request
//! by its id and publishes complete directories only.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod colormap;
pub mod connectome;
pub mod heatmap;
pub mod raster;
pub mod store;
pub mod table;

pub use colormap::{connectivity_color, coolwarm};
pub use connectome::{render_connectome, select_top_edges, ConnectomeEdge};
pub use heatmap::render_heatmap;
pub use store::{
    ArtifactFailure, ArtifactHandle, ArtifactKind, ArtifactReport, ArtifactStore, PurgeReport,
    StagedRequest,
};
pub use table::connection_table_csv;

use brainconn_structures::{ConnectionTable, ConnectivityMatrix};
use uuid::Uuid;

/// Image sizes and edge selection for rendered artifacts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub heatmap_width: u32,
    pub heatmap_height: u32,
    pub connectome_panel_size: u32,
    /// Connectome edges at or above this percentile of off-diagonal |weight|
    pub edge_percentile: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            heatmap_width: 1200,
            heatmap_height: 1000,
            connectome_panel_size: 400,
            edge_percentile: 80.0,
        }
    }
}

/// Render all artifacts for one request and publish them under `request_id`.
///
/// Never fails as a whole: individual failures land in
/// [`ArtifactReport::failures`] and do not affect the others.
pub fn generate_artifacts(
    store: &ArtifactStore,
    request_id: Uuid,
    matrix: &ConnectivityMatrix,
    table: &ConnectionTable,
    centroids: &[[f64; 3]],
    options: &RenderOptions,
) -> ArtifactReport {
    let mut staged = match store.begin(request_id) {
        Ok(staged) => staged,
        Err(e) => {
            tracing::warn!(target: "brainconn-artifacts", "{}", e);
            return ArtifactReport::all_failed(&e);
        }
    };

    staged.write(ArtifactKind::Heatmap, || {
        render_heatmap(matrix, options.heatmap_width, options.heatmap_height)?.to_png_bytes()
    });
    staged.write(ArtifactKind::Connectome, || {
        render_connectome(
            matrix,
            centroids,
            options.connectome_panel_size,
            options.edge_percentile,
        )?
        .to_png_bytes()
    });
    staged.write(ArtifactKind::ConnectionTable, || connection_table_csv(table));

    staged.publish()
}
