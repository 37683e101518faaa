// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Request orchestration
//!
//! [`ConnectivityPipeline`] is built once at startup and shared by reference
//! (or `Arc`) between any number of concurrent requests. Each request runs
//! extraction, graph construction and inference in that order, then renders
//! its artifacts under a fresh UUIDv7.

use crate::atlas::{Atlas, AtlasProvider, LocalAtlasProvider};
use crate::extraction::extract_time_series;
use crate::graph::build_graph;
use crate::metrics::ConnectivityMetrics;
use crate::model::{load_model, ConnectivityModel};
use brainconn_artifacts::{generate_artifacts, ArtifactReport, ArtifactStore, RenderOptions};
use brainconn_config::BrainconnConfig;
use brainconn_io::load_scan;
use brainconn_structures::{
    ConnectionTable, ConnectivityError, ConnectivityMatrix, ConnectivityResult, Scan,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, info_span};
use uuid::Uuid;

/// Scan file extensions accepted by [`ConnectivityPipeline::process`]
pub const SCAN_EXTENSIONS: [&str; 2] = [".nii", ".nii.gz"];

/// Everything produced for one request
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub request_id: Uuid,
    pub matrix: ConnectivityMatrix,
    pub region_names: Vec<String>,
    pub metrics: ConnectivityMetrics,
    pub connection_table: ConnectionTable,
    pub artifacts: ArtifactReport,
}

/// Atlas, model and artifact store shared by every request
#[derive(Debug, Clone)]
pub struct ConnectivityPipeline {
    atlas: Arc<Atlas>,
    centroids: Arc<Vec<[f64; 3]>>,
    model: Arc<ConnectivityModel>,
    store: Arc<ArtifactStore>,
    render: RenderOptions,
}

impl ConnectivityPipeline {
    pub fn new(
        atlas: Atlas,
        model: ConnectivityModel,
        store: ArtifactStore,
        render: RenderOptions,
    ) -> ConnectivityResult<Self> {
        if model.shape().num_regions != atlas.num_regions() {
            return Err(ConnectivityError::Model(format!(
                "model covers {} regions but atlas {} has {}",
                model.shape().num_regions,
                atlas.name(),
                atlas.num_regions()
            )));
        }
        let centroids = atlas.region_centroids();
        Ok(Self {
            atlas: Arc::new(atlas),
            centroids: Arc::new(centroids),
            model: Arc::new(model),
            store: Arc::new(store),
            render,
        })
    }

    /// Load the atlas, weights and artifact store named by `config`
    pub fn from_config(config: &BrainconnConfig) -> ConnectivityResult<Self> {
        let provider = LocalAtlasProvider::new(
            config.resolve_path(&config.atlas.cache_dir),
            &config.atlas.name,
        );
        let atlas = provider.get_atlas()?;
        let weights_path = config.resolve_path(&config.model.weights_path);
        let model = load_model(&config.model, &weights_path, &atlas)?;
        let store = ArtifactStore::new(
            config.resolve_path(&config.artifacts.output_dir),
            Duration::from_secs(config.artifacts.ttl_secs),
        )?;
        let render = RenderOptions {
            heatmap_width: config.artifacts.heatmap_width,
            heatmap_height: config.artifacts.heatmap_height,
            connectome_panel_size: config.artifacts.connectome_panel_size,
            edge_percentile: config.artifacts.edge_percentile,
        };

        info!(
            target: "brainconn-connectivity",
            "Pipeline ready: atlas {} ({} regions), artifacts in {}",
            atlas.name(),
            atlas.num_regions(),
            store.root().display()
        );
        Self::new(atlas, model, store, render)
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn model(&self) -> &ConnectivityModel {
        &self.model
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn region_names(&self) -> Vec<String> {
        self.atlas.region_names()
    }

    /// Numeric stages only: extraction, graph, inference
    pub fn compute(&self, scan: &Scan) -> ConnectivityResult<ConnectivityMatrix> {
        let series = extract_time_series(scan, &self.atlas)?;
        let edges = build_graph(series.data());
        debug!(
            target: "brainconn-connectivity",
            "Correlation graph: {} regions, {} directed edges",
            series.num_regions(),
            edges.len()
        );
        self.model.compute(series.data(), &edges)
    }

    /// Run one request end to end.
    ///
    /// Errors before the artifact stage abort the request and leave nothing
    /// on disk. Artifact failures are reported in the output instead.
    pub fn process(&self, scan_path: &Path) -> ConnectivityResult<PipelineOutput> {
        let request_id = Uuid::now_v7();
        let span = info_span!(target: "brainconn-connectivity", "process", request_id = %request_id);
        let _enter = span.enter();
        let started = Instant::now();

        check_scan_extension(scan_path)?;
        let scan = load_scan(scan_path)?;
        let matrix = self.compute(&scan)?;
        let region_names = self.region_names();
        let connection_table = ConnectionTable::from_matrix(&matrix, &region_names)?;
        let metrics = ConnectivityMetrics::from_matrix(&matrix);

        let artifacts = generate_artifacts(
            &self.store,
            request_id,
            &matrix,
            &connection_table,
            &self.centroids,
            &self.render,
        );

        info!(
            target: "brainconn-connectivity",
            "Processed {} in {:?}: {} regions, mean connectivity {:.4}, {} artifacts, {} artifact failures",
            scan_path.display(),
            started.elapsed(),
            metrics.num_regions,
            metrics.mean_connectivity,
            artifacts.published.len(),
            artifacts.failures.len()
        );

        Ok(PipelineOutput {
            request_id,
            matrix,
            region_names,
            metrics,
            connection_table,
            artifacts,
        })
    }
}

/// Reject files that are not `.nii` or `.nii.gz`
pub fn check_scan_extension(path: &Path) -> ConnectivityResult<()> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if SCAN_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        Ok(())
    } else {
        Err(ConnectivityError::Input(format!(
            "{} is not a NIfTI file, expected one of {:?}",
            path.display(),
            SCAN_EXTENSIONS
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_check() {
        assert!(check_scan_extension(Path::new("/tmp/sub-01_bold.nii")).is_ok());
        assert!(check_scan_extension(Path::new("scan.nii.gz")).is_ok());
        assert!(matches!(
            check_scan_extension(Path::new("scan.gz")),
            Err(ConnectivityError::Input(_))
        ));
        assert!(matches!(
            check_scan_extension(Path::new("scan.txt")),
            Err(ConnectivityError::Input(_))
        ));
    }

    #[test]
    fn test_pipeline_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConnectivityPipeline>();
    }
}
