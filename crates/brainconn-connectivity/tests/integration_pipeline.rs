// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the full connectivity pipeline
//!
//! Every test builds a synthetic 4-region atlas and scans on disk.

mod common;

use brainconn_artifacts::ArtifactKind;
use brainconn_connectivity::{
    build_graph, extract_time_series, AtlasProvider, ConnectivityPipeline, LocalAtlasProvider,
};
use brainconn_structures::{ConnectivityError, ErrorKind, Scan};
use common::*;
use std::collections::HashSet;

const TIMEPOINTS: usize = 50;

fn ready_pipeline(root: &std::path::Path) -> ConnectivityPipeline {
    write_quadrant_atlas(root);
    write_weights(&root.join("model.ckpt"), TIMEPOINTS, 8, 42);
    ConnectivityPipeline::from_config(&test_config(root)).expect("pipeline should build")
}

#[test]
fn test_identical_courses_full_graph() {
    let dir = create_temp_dir();
    let cache_dir = write_quadrant_atlas(dir.path());
    let atlas = LocalAtlasProvider::new(&cache_dir, ATLAS_NAME).get_atlas().unwrap();
    let scan = Scan::new(identical_course_scan(TIMEPOINTS), voxel_affine()).unwrap();

    let series = extract_time_series(&scan, &atlas).unwrap();
    assert_eq!(series.num_regions(), 4);
    assert_eq!(series.timepoints(), TIMEPOINTS);
    assert_eq!(build_graph(series.data()).len(), 12);

    write_weights(&dir.path().join("model.ckpt"), TIMEPOINTS, 8, 42);
    let pipeline = ConnectivityPipeline::from_config(&test_config(dir.path())).unwrap();
    let matrix = pipeline.compute(&scan).unwrap();
    for i in 0..4 {
        for j in 0..4 {
            assert_eq!(matrix.get(i, j), matrix.get(j, i));
            assert!((-1.0..=1.0).contains(&matrix.get(i, j)));
        }
    }
}

#[test]
fn test_process_publishes_everything() {
    let dir = create_temp_dir();
    let pipeline = ready_pipeline(dir.path());
    let scan_path = write_scan(dir.path(), "sub-01_bold.nii.gz", &varied_scan(TIMEPOINTS));

    let output = pipeline.process(&scan_path).unwrap();

    assert_eq!(output.region_names, REGION_NAMES.map(String::from).to_vec());
    assert_eq!(output.metrics.num_regions, 4);
    assert_eq!(output.connection_table.len(), 6);
    assert!(output.artifacts.is_complete(), "{:?}", output.artifacts.failures);

    let request_dir = pipeline.store().request_dir(output.request_id);
    for kind in ArtifactKind::ALL {
        let handle = output.artifacts.get(kind).expect("artifact published");
        assert_eq!(handle.request_id, output.request_id);
        assert_eq!(handle.path, request_dir.join(kind.file_name()));
        assert!(handle.path.is_file());
    }

    let mean = output.matrix.values().sum() / 16.0;
    assert_approx_eq(output.metrics.mean_connectivity, mean, 1e-12);
}

#[test]
fn test_same_scan_same_matrix() {
    let dir = create_temp_dir();
    let pipeline = ready_pipeline(dir.path());
    let scan_path = write_scan(dir.path(), "scan.nii", &varied_scan(TIMEPOINTS));

    let first = pipeline.process(&scan_path).unwrap();
    let second = pipeline.process(&scan_path).unwrap();

    assert_eq!(first.matrix, second.matrix);
    assert_ne!(first.request_id, second.request_id);
    assert_ne!(
        pipeline.store().request_dir(first.request_id),
        pipeline.store().request_dir(second.request_id)
    );
}

#[test]
fn test_single_timepoint_is_input_error() {
    let dir = create_temp_dir();
    let pipeline = ready_pipeline(dir.path());
    let scan_path = write_scan(dir.path(), "short.nii.gz", &varied_scan(1));

    let err = pipeline.process(&scan_path).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(dir_entries(pipeline.store().root()).is_empty());
}

#[test]
fn test_timepoint_mismatch_is_model_error() {
    let dir = create_temp_dir();
    let pipeline = ready_pipeline(dir.path());
    let scan_path = write_scan(dir.path(), "longer.nii.gz", &varied_scan(TIMEPOINTS + 10));

    let err = pipeline.process(&scan_path).unwrap_err();

    assert!(matches!(err, ConnectivityError::Model(_)), "{}", err);
    assert!(dir_entries(pipeline.store().root()).is_empty());
}

#[test]
fn test_unsupported_extension_is_input_error() {
    let dir = create_temp_dir();
    let pipeline = ready_pipeline(dir.path());
    let path = dir.path().join("scan.txt");
    std::fs::write(&path, b"not a scan").unwrap();

    assert_eq!(pipeline.process(&path).unwrap_err().kind(), ErrorKind::Input);
}

#[test]
fn test_missing_weights_is_model_error() {
    let dir = create_temp_dir();
    write_quadrant_atlas(dir.path());

    let err = ConnectivityPipeline::from_config(&test_config(dir.path())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Model);
}

#[test]
fn test_untrained_fallback_when_enabled() {
    let dir = create_temp_dir();
    write_quadrant_atlas(dir.path());
    let mut config = test_config(dir.path());
    config.model.allow_untrained_fallback = true;

    // Without a feature width the fallback cannot build a model
    let err = ConnectivityPipeline::from_config(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Model);

    config.model.num_features = Some(TIMEPOINTS);
    let pipeline = ConnectivityPipeline::from_config(&config).unwrap();
    assert!(pipeline.model().source().starts_with("untrained"));

    let scan_path = write_scan(dir.path(), "scan.nii.gz", &varied_scan(TIMEPOINTS));
    let output = pipeline.process(&scan_path).unwrap();
    assert_eq!(output.matrix.num_regions(), 4);
}

#[test]
fn test_region_count_mismatch_ignores_fallback() {
    let dir = create_temp_dir();
    write_quadrant_atlas(dir.path());
    let shape = brainconn_serialization::GcnShape {
        num_regions: 3,
        num_features: TIMEPOINTS,
        hidden_dim: 8,
    };
    let checkpoint = brainconn_connectivity::ConnectivityModel::untrained(shape, 1)
        .unwrap()
        .to_checkpoint(Default::default())
        .unwrap();
    brainconn_serialization::save_checkpoint(&checkpoint, dir.path().join("model.ckpt")).unwrap();

    let mut config = test_config(dir.path());
    config.model.allow_untrained_fallback = true;
    config.model.num_features = Some(TIMEPOINTS);

    let err = ConnectivityPipeline::from_config(&config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Model);
}

#[test]
fn test_concurrent_requests_use_distinct_directories() {
    let dir = create_temp_dir();
    let pipeline = ready_pipeline(dir.path());
    let scan_path = write_scan(dir.path(), "scan.nii.gz", &varied_scan(TIMEPOINTS));

    let outputs: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| pipeline.process(&scan_path)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker panicked").expect("request failed"))
            .collect()
    });

    let ids: HashSet<_> = outputs.iter().map(|o| o.request_id).collect();
    assert_eq!(ids.len(), 4);
    for output in &outputs {
        assert!(output.artifacts.is_complete());
        assert_eq!(output.matrix, outputs[0].matrix);
    }
    let published = dir_entries(pipeline.store().root());
    assert_eq!(published.len(), 4);
    assert!(published
        .iter()
        .all(|p| !p.file_name().unwrap().to_string_lossy().starts_with('.')));
}
