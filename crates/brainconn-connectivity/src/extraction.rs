// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Region time-series extraction
//!
//! The atlas is resampled onto the scan grid (nearest neighbour), voxel time
//! courses are averaged per region, and each region's course is z-scored.

use crate::atlas::Atlas;
use brainconn_structures::{
    Affine, ConnectivityError, ConnectivityResult, LabelVolume, RegionTimeSeries, Scan,
};
use ndarray::{Array1, Array2, Array3, Axis};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Sample standard deviations below this (relative to the row's magnitude)
/// are treated as zero
pub const MIN_STD: f64 = 1e-12;

/// Resample a label volume onto another voxel grid by nearest neighbour.
///
/// Each target voxel index goes through `target_affine` to world space, then
/// through the inverse label affine back to label voxel space, and is rounded.
/// Points that land outside the label grid become background.
pub fn resample_labels_nearest(
    labels: &LabelVolume,
    grid: (usize, usize, usize),
    target_affine: &Affine,
) -> ConnectivityResult<Array3<i32>> {
    if target_affine.inverse().is_none() {
        return Err(ConnectivityError::Data(
            "scan affine is not invertible".to_string(),
        ));
    }
    let world_to_label = labels.affine().inverse().ok_or_else(|| {
        ConnectivityError::Data("atlas affine is not invertible".to_string())
    })?;
    let voxel_to_label = world_to_label.compose(target_affine);

    Ok(Array3::from_shape_fn(grid, |(x, y, z)| {
        let [lx, ly, lz] = voxel_to_label.apply([x as f64, y as f64, z as f64]);
        if !(lx.is_finite() && ly.is_finite() && lz.is_finite()) {
            return 0;
        }
        labels
            .get(lx.round() as i64, ly.round() as i64, lz.round() as i64)
            .unwrap_or(0)
    }))
}

/// z-score every row in place (ddof = 1).
///
/// Rows whose sample standard deviation is below [`MIN_STD`] times
/// `max(1, |mean|)`, or not finite, become all zeros; any remaining NaN
/// becomes zero.
pub fn zscore_rows(data: &mut Array2<f64>) {
    let n = data.ncols();
    for mut row in data.axis_iter_mut(Axis(0)) {
        if n < 2 {
            row.fill(0.0);
            continue;
        }
        let mean = row.sum() / n as f64;
        let var = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1) as f64;
        let std = var.sqrt();
        if !std.is_finite() || std < MIN_STD * mean.abs().max(1.0) {
            row.fill(0.0);
        } else {
            row.mapv_inplace(|v| (v - mean) / std);
        }
    }
    data.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
}

/// Average and normalise the scan's time course inside every atlas region.
///
/// Rows follow atlas region order. A region with no voxel inside the scan's
/// field of view yields a zero row; if no region has any voxel the geometry
/// is degenerate and extraction fails.
pub fn extract_time_series(scan: &Scan, atlas: &Atlas) -> ConnectivityResult<RegionTimeSeries> {
    let resampled = resample_labels_nearest(atlas.volume(), scan.grid(), scan.affine())?;

    let row_of: HashMap<i32, usize> = atlas
        .regions()
        .iter()
        .enumerate()
        .map(|(i, region)| (region.label, i))
        .collect();
    let mut voxels: Vec<Vec<(usize, usize, usize)>> = vec![Vec::new(); atlas.num_regions()];
    for (index, label) in resampled.indexed_iter() {
        if let Some(&row) = row_of.get(label) {
            voxels[row].push(index);
        }
    }

    if voxels.iter().all(Vec::is_empty) {
        return Err(ConnectivityError::Data(
            "no scan voxel falls inside any atlas region; check that scan and atlas share a space"
                .to_string(),
        ));
    }
    for (region, members) in atlas.regions().iter().zip(&voxels) {
        if members.is_empty() {
            warn!(
                target: "brainconn-connectivity",
                "Region {} '{}' is outside the scan field of view, using a zero time series",
                region.label, region.name
            );
        }
    }

    let timepoints = scan.timepoints();
    let means: Vec<Array1<f64>> = voxels
        .par_iter()
        .map(|members| {
            let mut acc = Array1::<f64>::zeros(timepoints);
            for &(x, y, z) in members {
                acc += &scan.voxel_series(x, y, z);
            }
            if !members.is_empty() {
                acc /= members.len() as f64;
            }
            acc
        })
        .collect();

    let mut data = Array2::<f64>::zeros((atlas.num_regions(), timepoints));
    for (mut row, mean) in data.axis_iter_mut(Axis(0)).zip(&means) {
        row.assign(mean);
    }
    zscore_rows(&mut data);

    debug!(
        target: "brainconn-connectivity",
        "Extracted {} regions x {} timepoints",
        data.nrows(),
        data.ncols()
    );
    RegionTimeSeries::new(data, atlas.region_names(), atlas.labels())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array4};

    fn assert_normalised(row: ndarray::ArrayView1<'_, f64>) {
        let n = row.len() as f64;
        let mean = row.sum() / n;
        let var = row.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert!(mean.abs() < 1e-9, "mean {}", mean);
        assert!((var - 1.0).abs() < 1e-9, "var {}", var);
    }

    #[test]
    fn test_zscore_rows() {
        let mut data = array![[1.0, 2.0, 3.0, 4.0], [5.0, 5.0, 5.0, 5.0], [0.0, f64::NAN, 1.0, 2.0]];
        zscore_rows(&mut data);

        assert_normalised(data.row(0));
        assert!(data.row(1).iter().all(|&v| v == 0.0));
        assert!(data.row(2).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_resample_identity_and_offset() {
        let mut labels = Array3::<i32>::zeros((3, 3, 3));
        labels[[1, 1, 1]] = 7;
        let atlas = LabelVolume::new(labels, Affine::identity());

        let same = resample_labels_nearest(&atlas, (3, 3, 3), &Affine::identity()).unwrap();
        assert_eq!(same[[1, 1, 1]], 7);

        // Target grid shifted by +1 voxel in world space
        let shifted = Affine::identity().with_translation([1.0, 1.0, 1.0]);
        let moved = resample_labels_nearest(&atlas, (3, 3, 3), &shifted).unwrap();
        assert_eq!(moved[[0, 0, 0]], 7);
        assert_eq!(moved[[2, 2, 2]], 0);
    }

    #[test]
    fn test_resample_coarser_target() {
        // 1mm atlas, 2mm scan: scan voxel i covers atlas voxel 2i
        let mut labels = Array3::<i32>::zeros((4, 4, 4));
        labels[[2, 2, 2]] = 3;
        let atlas = LabelVolume::new(labels, Affine::identity());
        let scan_affine = Affine::from_scaling([2.0, 2.0, 2.0]);

        let resampled = resample_labels_nearest(&atlas, (2, 2, 2), &scan_affine).unwrap();
        assert_eq!(resampled[[1, 1, 1]], 3);
        assert_eq!(resampled[[0, 0, 0]], 0);
    }

    #[test]
    fn test_singular_affine_is_data_error() {
        let atlas = LabelVolume::new(Array3::<i32>::zeros((2, 2, 2)), Affine::identity());
        let singular = Affine::from_scaling([1.0, 0.0, 1.0]);
        assert!(matches!(
            resample_labels_nearest(&atlas, (2, 2, 2), &singular),
            Err(ConnectivityError::Data(_))
        ));
    }

    #[test]
    fn test_extract_zero_row_outside_field_of_view() {
        let mut labels = Array3::<i32>::zeros((6, 2, 2));
        labels[[0, 0, 0]] = 1;
        labels[[5, 0, 0]] = 2;
        let atlas = Atlas::new(
            "t",
            LabelVolume::new(labels, Affine::identity()),
            &["bg".to_string(), "near".to_string(), "far".to_string()],
        )
        .unwrap();

        // Scan only covers x in 0..3
        let data = Array4::from_shape_fn((3, 2, 2, 5), |(x, _, _, t)| (x + 1) as f64 * t as f64);
        let scan = Scan::new(data, Affine::identity()).unwrap();
        let series = extract_time_series(&scan, &atlas).unwrap();

        assert_eq!(series.num_regions(), 2);
        assert_normalised(series.row(0));
        assert!(series.row(1).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_extract_degenerate_geometry() {
        let mut labels = Array3::<i32>::zeros((2, 2, 2));
        labels[[0, 0, 0]] = 1;
        let atlas = Atlas::new(
            "t",
            LabelVolume::new(labels, Affine::identity()),
            &["bg".to_string(), "a".to_string()],
        )
        .unwrap();
        let far_away = Affine::identity().with_translation([500.0, 0.0, 0.0]);
        let scan = Scan::new(Array4::zeros((2, 2, 2, 4)), far_away).unwrap();

        assert!(matches!(
            extract_time_series(&scan, &atlas),
            Err(ConnectivityError::Data(_))
        ));
    }
}
