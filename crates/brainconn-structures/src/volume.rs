// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{Affine, ConnectivityError, ConnectivityResult};
use ndarray::{Array3, Array4, ArrayView1, Axis};

/// A functional scan: `(x, y, z, time)` samples plus the voxel-to-world affine.
///
/// Read-only once constructed. A scan with fewer than 2 timepoints cannot be
/// constructed.
#[derive(Debug, Clone)]
pub struct Scan {
    data: Array4<f64>,
    affine: Affine,
}

impl Scan {
    pub fn new(data: Array4<f64>, affine: Affine) -> ConnectivityResult<Self> {
        let (nx, ny, nz, nt) = data.dim();
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(ConnectivityError::Input(format!(
                "scan has an empty spatial grid ({}x{}x{})",
                nx, ny, nz
            )));
        }
        if nt < 2 {
            return Err(ConnectivityError::Input(format!(
                "scan has {} timepoint(s), need at least 2",
                nt
            )));
        }
        Ok(Self { data, affine })
    }

    pub fn data(&self) -> &Array4<f64> {
        &self.data
    }

    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    /// Spatial grid dimensions `(x, y, z)`
    pub fn grid(&self) -> (usize, usize, usize) {
        let (nx, ny, nz, _) = self.data.dim();
        (nx, ny, nz)
    }

    pub fn timepoints(&self) -> usize {
        self.data.len_of(Axis(3))
    }

    /// Time course of one voxel
    pub fn voxel_series(&self, x: usize, y: usize, z: usize) -> ArrayView1<'_, f64> {
        self.data
            .index_axis(Axis(0), x)
            .index_axis_move(Axis(0), y)
            .index_axis_move(Axis(0), z)
    }
}

/// 3D integer label volume, `0` is background
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVolume {
    labels: Array3<i32>,
    affine: Affine,
}

impl LabelVolume {
    pub fn new(labels: Array3<i32>, affine: Affine) -> Self {
        Self { labels, affine }
    }

    pub fn labels(&self) -> &Array3<i32> {
        &self.labels
    }

    pub fn affine(&self) -> &Affine {
        &self.affine
    }

    pub fn grid(&self) -> (usize, usize, usize) {
        self.labels.dim()
    }

    /// Label at an integer voxel index, `None` outside the grid
    pub fn get(&self, x: i64, y: i64, z: i64) -> Option<i32> {
        if x < 0 || y < 0 || z < 0 {
            return None;
        }
        self.labels.get((x as usize, y as usize, z as usize)).copied()
    }
}
