// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end pipeline runs through the umbrella crate
//!
//! Configuration comes from a TOML file, the atlas and scan are synthetic
//! NIfTI files, and weights are written by `ConnectivityModel::untrained`.

use brainconn::io::{write_nifti, NiftiDataType};
use brainconn::prelude::*;
use brainconn::serialization::CheckpointMetadata;
use ndarray::{Array3, Array4};
use std::fs;
use std::path::Path;

const TIMEPOINTS: usize = 40;
const REGIONS: [&str; 5] = ["Caudate", "Putamen", "Pallidum", "Thalamus", "Hippocampus"];

/// Five slabs along x, two voxels each, 2mm isotropic, origin at -10mm
fn affine() -> Affine {
    Affine::from_scaling([2.0, 2.0, 2.0]).with_translation([-10.0, -4.0, -2.0])
}

fn write_atlas(root: &Path) {
    let dir = root.join("atlases").join("slabs");
    fs::create_dir_all(&dir).unwrap();
    let labels = Array3::from_shape_fn((10, 4, 3), |(x, _, _)| (x / 2 + 1) as f64);
    write_nifti(dir.join("atlas.nii.gz"), labels.view().into_dyn(), &affine(), NiftiDataType::Int16)
        .unwrap();
    let mut text = String::from("Background\n");
    for name in REGIONS {
        text.push_str(name);
        text.push('\n');
    }
    fs::write(dir.join("labels.txt"), text).unwrap();
}

fn write_scan(root: &Path, timepoints: usize) -> std::path::PathBuf {
    let data = Array4::from_shape_fn((10, 4, 3, timepoints), |(x, y, z, t)| {
        let slab = (x / 2) as f64;
        let shared = (t as f64 * 0.2).sin() * 3.0;
        let own = (t as f64 * (0.35 + 0.1 * slab)).cos() * (1.0 + slab);
        1000.0 + shared + own + (y + z) as f64 * 0.02
    });
    let path = root.join("sub-02_bold.nii.gz");
    write_nifti(&path, data.view().into_dyn(), &affine(), NiftiDataType::Float32).unwrap();
    path
}

fn write_weights(root: &Path) {
    let shape = GcnShape {
        num_regions: REGIONS.len(),
        num_features: TIMEPOINTS,
        hidden_dim: 16,
    };
    let checkpoint = ConnectivityModel::untrained(shape, 3)
        .unwrap()
        .to_checkpoint(CheckpointMetadata::default())
        .unwrap();
    fs::create_dir_all(root.join("models")).unwrap();
    save_checkpoint(&checkpoint, root.join("models/gcn.ckpt")).unwrap();
}

fn write_config(root: &Path) -> std::path::PathBuf {
    let path = root.join("brainconn_configuration.toml");
    let toml = format!(
        r#"
[system]
log_level = "debug"
data_dir = "{}"

[atlas]
name = "slabs"
cache_dir = "atlases"

[model]
weights_path = "models/gcn.ckpt"
hidden_dim = 16

[artifacts]
output_dir = "results"
heatmap_width = 200
heatmap_height = 160
connectome_panel_size = 120
"#,
        root.display().to_string().replace('\\', "/")
    );
    fs::write(&path, toml).unwrap();
    path
}

#[test]
fn test_scan_to_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_atlas(root);
    write_weights(root);
    let scan_path = write_scan(root, TIMEPOINTS);
    let config = load_config(Some(write_config(root).as_path()), None).unwrap();

    let pipeline = ConnectivityPipeline::from_config(&config).unwrap();
    let output = pipeline.process(&scan_path).unwrap();

    assert_eq!(output.region_names, REGIONS.map(String::from).to_vec());
    assert_eq!(output.matrix.num_regions(), 5);
    assert_eq!(output.connection_table.len(), 10);
    assert!(output.artifacts.is_complete());

    let request_dir = root.join("results").join(output.request_id.to_string());
    let heatmap = fs::read(request_dir.join("connectivity_matrix.png")).unwrap();
    assert_eq!(&heatmap[..8], b"\x89PNG\r\n\x1a\n");
    let connectome = fs::read(request_dir.join("connectome.png")).unwrap();
    assert_eq!(&connectome[..8], b"\x89PNG\r\n\x1a\n");

    let csv = fs::read_to_string(request_dir.join("connection_strengths.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("region_a,region_b,weight"));
    assert_eq!(lines.next().map(|l| l.starts_with("Caudate,Putamen,")), Some(true));
    assert_eq!(lines.count(), 9);
}

#[test]
fn test_failed_request_leaves_no_results() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_atlas(root);
    write_weights(root);
    let config = load_config(Some(write_config(root).as_path()), None).unwrap();
    let pipeline = ConnectivityPipeline::from_config(&config).unwrap();

    // Wrong number of timepoints for the loaded weights
    let scan_path = write_scan(root, TIMEPOINTS / 2);
    let err = pipeline.process(&scan_path).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Model);
    assert_eq!(fs::read_dir(root.join("results")).unwrap().count(), 0);
}

#[test]
fn test_output_serializes_for_clients() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_atlas(root);
    write_weights(root);
    let scan_path = write_scan(root, TIMEPOINTS);
    let config = load_config(Some(write_config(root).as_path()), None).unwrap();

    let output = ConnectivityPipeline::from_config(&config)
        .unwrap()
        .process(&scan_path)
        .unwrap();
    let json = serde_json::to_value(&output).unwrap();

    let matrix = json["matrix"].as_array().unwrap();
    assert_eq!(matrix.len(), 5);
    for (i, row) in matrix.iter().enumerate() {
        for (j, value) in row.as_array().unwrap().iter().enumerate() {
            assert_eq!(value, &matrix[j][i]);
            assert!(value.as_f64().unwrap().abs() <= 1.0);
        }
    }
    assert_eq!(json["metrics"]["num_regions"], 5);
    assert_eq!(json["artifacts"]["published"].as_array().unwrap().len(), 3);
}
