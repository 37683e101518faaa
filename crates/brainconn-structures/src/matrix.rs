// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{ConnectivityError, ConnectivityResult};
use ndarray::Array2;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

/// Symmetric `regions x regions` connectivity scores.
///
/// Only constructible through [`ConnectivityMatrix::try_new`], which enforces
/// that the matrix is square, non-empty, finite, bounded to `[-1, 1]` and
/// exactly symmetric. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityMatrix {
    values: Array2<f64>,
}

impl ConnectivityMatrix {
    pub fn try_new(values: Array2<f64>) -> ConnectivityResult<Self> {
        let (rows, cols) = values.dim();
        if rows == 0 || rows != cols {
            return Err(ConnectivityError::Model(format!(
                "connectivity matrix must be square and non-empty, got {}x{}",
                rows, cols
            )));
        }
        for ((i, j), &value) in values.indexed_iter() {
            if !value.is_finite() {
                return Err(ConnectivityError::Model(format!(
                    "connectivity matrix has non-finite entry at ({}, {})",
                    i, j
                )));
            }
            if !(-1.0..=1.0).contains(&value) {
                return Err(ConnectivityError::Model(format!(
                    "connectivity matrix entry ({}, {}) = {} is outside [-1, 1]",
                    i, j, value
                )));
            }
            if j > i && value != values[[j, i]] {
                return Err(ConnectivityError::Model(format!(
                    "connectivity matrix is not symmetric at ({}, {})",
                    i, j
                )));
            }
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn num_regions(&self) -> usize {
        self.values.nrows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[[i, j]]
    }

    /// Nested rows, the shape clients receive
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values.rows().into_iter().map(|row| row.to_vec()).collect()
    }

    /// Off-diagonal upper-triangle entries `(i, j, weight)` with `i < j`
    pub fn upper_triangle(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.num_regions();
        (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j, self.values[[i, j]])))
    }
}

impl Serialize for ConnectivityMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.num_regions()))?;
        for row in self.values.rows() {
            seq.serialize_element(&row.to_vec())?;
        }
        seq.end()
    }
}

/// One unordered region pair and its connectivity weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRow {
    pub region_a: String,
    pub region_b: String,
    pub weight: f64,
}

/// Deduplicated upper-triangular view of a [`ConnectivityMatrix`].
///
/// Holds exactly `N * (N - 1) / 2` rows for `N` regions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionTable {
    rows: Vec<ConnectionRow>,
}

impl ConnectionTable {
    pub fn from_matrix(matrix: &ConnectivityMatrix, region_names: &[String]) -> ConnectivityResult<Self> {
        if region_names.len() != matrix.num_regions() {
            return Err(ConnectivityError::Data(format!(
                "{} region names for a {}-region matrix",
                region_names.len(),
                matrix.num_regions()
            )));
        }
        let rows = matrix
            .upper_triangle()
            .map(|(i, j, weight)| ConnectionRow {
                region_a: region_names[i].clone(),
                region_b: region_names[j].clone(),
                weight,
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[ConnectionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::collections::HashSet;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Region_{}", i)).collect()
    }

    #[test]
    fn test_accepts_symmetric_bounded() {
        let matrix = ConnectivityMatrix::try_new(array![[1.0, -0.5], [-0.5, 0.2]]).unwrap();
        assert_eq!(matrix.num_regions(), 2);
        assert_eq!(matrix.to_rows(), vec![vec![1.0, -0.5], vec![-0.5, 0.2]]);
    }

    #[test]
    fn test_rejects_asymmetric() {
        let result = ConnectivityMatrix::try_new(array![[0.0, 0.1], [0.2, 0.0]]);
        assert!(matches!(result, Err(ConnectivityError::Model(_))));
    }

    #[test]
    fn test_rejects_out_of_bounds_and_nan() {
        assert!(ConnectivityMatrix::try_new(array![[1.5]]).is_err());
        assert!(ConnectivityMatrix::try_new(array![[f64::NAN]]).is_err());
        assert!(ConnectivityMatrix::try_new(Array2::zeros((2, 3))).is_err());
    }

    #[test]
    fn test_connection_table_counts_unique_pairs() {
        let n = 6;
        let mut values = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                values[[i, j]] = ((i + j) as f64 / 20.0).min(1.0);
            }
        }
        let matrix = ConnectivityMatrix::try_new(values).unwrap();
        let table = ConnectionTable::from_matrix(&matrix, &names(n)).unwrap();
        assert_eq!(table.len(), n * (n - 1) / 2);

        let mut seen = HashSet::new();
        for row in table.rows() {
            assert_ne!(row.region_a, row.region_b);
            let key = if row.region_a < row.region_b {
                (row.region_a.clone(), row.region_b.clone())
            } else {
                (row.region_b.clone(), row.region_a.clone())
            };
            assert!(seen.insert(key), "duplicate pair");
        }
    }

    #[test]
    fn test_matrix_serializes_as_rows() {
        let matrix = ConnectivityMatrix::try_new(array![[0.5, 0.0], [0.0, 0.5]]).unwrap();
        let json = serde_json::to_string(&matrix).unwrap();
        assert_eq!(json, "[[0.5,0.0],[0.0,0.5]]");
    }
}
