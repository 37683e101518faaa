// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Common test utilities and helpers

#![allow(dead_code)]

use brainconn_config::BrainconnConfig;
use brainconn_connectivity::ConnectivityModel;
use brainconn_io::{write_nifti, NiftiDataType};
use brainconn_serialization::{save_checkpoint, CheckpointMetadata, GcnShape};
use brainconn_structures::Affine;
use ndarray::{Array3, Array4};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const ATLAS_NAME: &str = "test-quadrants";
pub const REGION_NAMES: [&str; 4] = ["Left Front", "Right Front", "Left Back", "Right Back"];
pub const GRID: (usize, usize, usize) = (8, 8, 2);

/// Create a temporary directory for test files
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn voxel_affine() -> Affine {
    Affine::from_scaling([2.0, 2.0, 2.0]).with_translation([-8.0, -8.0, 0.0])
}

/// Region label of a voxel: four quadrants in the x/y plane
pub fn quadrant(x: usize, y: usize) -> usize {
    1 + usize::from(x >= GRID.0 / 2) + 2 * usize::from(y >= GRID.1 / 2)
}

/// Write `<cache_dir>/<ATLAS_NAME>/{atlas.nii.gz, labels.txt}` and return the cache dir
pub fn write_quadrant_atlas(root: &Path) -> PathBuf {
    let cache_dir = root.join("atlases");
    let atlas_dir = cache_dir.join(ATLAS_NAME);
    fs::create_dir_all(&atlas_dir).expect("Failed to create atlas dir");

    let labels = Array3::from_shape_fn(GRID, |(x, y, _)| quadrant(x, y) as f64);
    write_nifti(
        atlas_dir.join("atlas.nii.gz"),
        labels.view().into_dyn(),
        &voxel_affine(),
        NiftiDataType::Int16,
    )
    .expect("Failed to write atlas");

    let mut text = String::from("Background\n");
    for name in REGION_NAMES {
        text.push_str(name);
        text.push('\n');
    }
    fs::write(atlas_dir.join("labels.txt"), text).expect("Failed to write labels");
    cache_dir
}

/// Every voxel follows the same time course
pub fn identical_course_scan(timepoints: usize) -> Array4<f64> {
    Array4::from_shape_fn((GRID.0, GRID.1, GRID.2, timepoints), |(_, _, _, t)| {
        100.0 + (t as f64 * 0.4).sin() * 5.0
    })
}

/// Each quadrant gets its own oscillation plus a small deterministic voxel wobble
pub fn varied_scan(timepoints: usize) -> Array4<f64> {
    Array4::from_shape_fn((GRID.0, GRID.1, GRID.2, timepoints), |(x, y, z, t)| {
        let region = quadrant(x, y) as f64;
        let signal = (t as f64 * 0.15 * region).sin() * 10.0 + (t as f64 * 0.05).cos() * region;
        let wobble = (((x * 31 + y * 17 + z * 7 + t * 13) % 11) as f64 - 5.0) * 0.05;
        500.0 + signal + wobble
    })
}

pub fn write_scan(dir: &Path, file_name: &str, data: &Array4<f64>) -> PathBuf {
    let path = dir.join(file_name);
    write_nifti(&path, data.view().into_dyn(), &voxel_affine(), NiftiDataType::Float32)
        .expect("Failed to write scan");
    path
}

/// Save seeded untrained weights for the quadrant atlas
pub fn write_weights(path: &Path, num_features: usize, hidden_dim: usize, seed: u64) {
    let shape = GcnShape {
        num_regions: REGION_NAMES.len(),
        num_features,
        hidden_dim,
    };
    let model = ConnectivityModel::untrained(shape, seed)
        .expect("Failed to build model")
        .with_region_names(REGION_NAMES.iter().map(|s| s.to_string()).collect());
    let checkpoint = model
        .to_checkpoint(CheckpointMetadata::default())
        .expect("Failed to snapshot model");
    save_checkpoint(&checkpoint, path).expect("Failed to save checkpoint");
}

/// Config rooted at `root` with the quadrant atlas and small artifact images
pub fn test_config(root: &Path) -> BrainconnConfig {
    let mut config = BrainconnConfig::default();
    config.system.data_dir = root.to_path_buf();
    config.atlas.name = ATLAS_NAME.to_string();
    config.atlas.cache_dir = PathBuf::from("atlases");
    config.model.weights_path = PathBuf::from("model.ckpt");
    config.model.hidden_dim = 8;
    config.artifacts.output_dir = PathBuf::from("uploads");
    config.artifacts.heatmap_width = 160;
    config.artifacts.heatmap_height = 120;
    config.artifacts.connectome_panel_size = 96;
    config
}

/// Entries directly inside `dir`, empty when it does not exist
pub fn dir_entries(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Assert that two f64 values are approximately equal
pub fn assert_approx_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} ≈ {}, but difference was {}",
        a,
        b,
        (a - b).abs()
    );
}
