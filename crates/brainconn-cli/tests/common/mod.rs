// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common test utilities and helpers

#![allow(dead_code)]

use brainconn_config::BrainconnConfig;
use brainconn_io::{write_nifti, NiftiDataType};
use brainconn_structures::Affine;
use ndarray::{Array3, Array4};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const ATLAS_NAME: &str = "cli-halves";
pub const TIMEPOINTS: usize = 30;

/// Create a temporary directory for test files
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Three slabs along x, labelled 1..=3, under `<root>/atlases/<ATLAS_NAME>/`
pub fn write_atlas(root: &Path) {
    let atlas_dir = root.join("atlases").join(ATLAS_NAME);
    fs::create_dir_all(&atlas_dir).expect("Failed to create atlas dir");
    let labels = Array3::from_shape_fn((6, 4, 2), |(x, _, _)| (x / 2 + 1) as f64);
    write_nifti(
        atlas_dir.join("atlas.nii"),
        labels.view().into_dyn(),
        &Affine::from_scaling([3.0, 3.0, 3.0]),
        NiftiDataType::UInt8,
    )
    .expect("Failed to write atlas");
    fs::write(atlas_dir.join("labels.txt"), "Background\nFront\nMiddle\nBack\n")
        .expect("Failed to write labels");
}

pub fn write_scan(root: &Path, timepoints: usize) -> PathBuf {
    let path = root.join("sub-01_task-rest_bold.nii.gz");
    let data = Array4::from_shape_fn((6, 4, 2, timepoints), |(x, y, _, t)| {
        let slab = (x / 2 + 1) as f64;
        200.0 + (t as f64 * 0.3 * slab).sin() * 4.0 + y as f64 * 0.01 * t as f64
    });
    write_nifti(
        &path,
        data.view().into_dyn(),
        &Affine::from_scaling([3.0, 3.0, 3.0]),
        NiftiDataType::Float32,
    )
    .expect("Failed to write scan");
    path
}

pub fn test_config(root: &Path) -> BrainconnConfig {
    let mut config = BrainconnConfig::default();
    config.system.data_dir = root.to_path_buf();
    config.atlas.name = ATLAS_NAME.to_string();
    config.atlas.cache_dir = PathBuf::from("atlases");
    config.model.weights_path = PathBuf::from("models/weights.ckpt");
    config.model.hidden_dim = 6;
    config.artifacts.output_dir = PathBuf::from("uploads");
    config.artifacts.heatmap_width = 128;
    config.artifacts.heatmap_height = 96;
    config.artifacts.connectome_panel_size = 64;
    config
}
