// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

/// 4x4 homogeneous voxel-to-world transform (row-major, last row `0 0 0 1`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    rows: [[f64; 4]; 4],
}

impl Default for Affine {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine {
    pub fn identity() -> Self {
        Self::from_scaling([1.0, 1.0, 1.0])
    }

    /// Diagonal scaling with no translation
    pub fn from_scaling(voxel_size: [f64; 3]) -> Self {
        let mut rows = [[0.0; 4]; 4];
        rows[0][0] = voxel_size[0];
        rows[1][1] = voxel_size[1];
        rows[2][2] = voxel_size[2];
        rows[3][3] = 1.0;
        Self { rows }
    }

    /// Build from the three spatial rows; the homogeneous row is implied
    pub fn from_spatial_rows(rows: [[f64; 4]; 3]) -> Self {
        Self {
            rows: [rows[0], rows[1], rows[2], [0.0, 0.0, 0.0, 1.0]],
        }
    }

    pub fn rows(&self) -> &[[f64; 4]; 4] {
        &self.rows
    }

    /// Translation column (world position of voxel `0, 0, 0`)
    pub fn translation(&self) -> [f64; 3] {
        [self.rows[0][3], self.rows[1][3], self.rows[2][3]]
    }

    pub fn with_translation(mut self, offset: [f64; 3]) -> Self {
        for (axis, value) in offset.iter().enumerate() {
            self.rows[axis][3] = *value;
        }
        self
    }

    /// Map a (possibly fractional) voxel coordinate to world space
    pub fn apply(&self, point: [f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (axis, value) in out.iter_mut().enumerate() {
            let row = &self.rows[axis];
            *value = row[0] * point[0] + row[1] * point[1] + row[2] * point[2] + row[3];
        }
        out
    }

    /// Inverse transform, `None` when the linear part is singular
    pub fn inverse(&self) -> Option<Affine> {
        let m = &self.rows;
        let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
        if !det.is_finite() || det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;

        let mut lin = [[0.0; 3]; 3];
        lin[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
        lin[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
        lin[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
        lin[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
        lin[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
        lin[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
        lin[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
        lin[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
        lin[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;

        let t = self.translation();
        let mut rows = [[0.0; 4]; 3];
        for r in 0..3 {
            rows[r][..3].copy_from_slice(&lin[r]);
            rows[r][3] = -(lin[r][0] * t[0] + lin[r][1] * t[1] + lin[r][2] * t[2]);
        }
        Some(Affine::from_spatial_rows(rows))
    }

    /// Compose: the result applies `inner` first, then `self`
    pub fn compose(&self, inner: &Affine) -> Affine {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = (0..4).map(|k| self.rows[r][k] * inner.rows[k][c]).sum();
            }
        }
        Affine { rows }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_scaling_with_translation() {
        let affine = Affine::from_scaling([2.0, 2.0, 2.0]).with_translation([-90.0, -126.0, -72.0]);
        assert!(approx(affine.apply([45.0, 63.0, 36.0]), [0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_inverse_roundtrips_points() {
        let affine = Affine::from_spatial_rows([
            [-2.0, 0.0, 0.3, 90.0],
            [0.1, 2.0, 0.0, -126.0],
            [0.0, 0.2, 2.5, -72.0],
        ]);
        let inverse = affine.inverse().unwrap();
        let point = [12.5, 3.0, 40.0];
        assert!(approx(inverse.apply(affine.apply(point)), point));
        assert!(approx(
            affine.compose(&inverse).apply([1.0, 2.0, 3.0]),
            [1.0, 2.0, 3.0]
        ));
    }

    #[test]
    fn test_singular_has_no_inverse() {
        let affine = Affine::from_scaling([1.0, 0.0, 1.0]);
        assert!(affine.inverse().is_none());
    }
}
