// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use brainconn_structures::ConnectivityMatrix;
use serde::{Deserialize, Serialize};

/// Summary statistics over every entry of a connectivity matrix (diagonal included)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityMetrics {
    pub mean_connectivity: f64,
    /// Population standard deviation
    pub std_connectivity: f64,
    pub max_connectivity: f64,
    pub min_connectivity: f64,
    pub num_regions: usize,
}

impl ConnectivityMetrics {
    pub fn from_matrix(matrix: &ConnectivityMatrix) -> Self {
        let values = matrix.values();
        let count = values.len() as f64;
        let mean = values.sum() / count;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });

        Self {
            mean_connectivity: mean,
            std_connectivity: variance.sqrt(),
            max_connectivity: max,
            min_connectivity: min,
            num_regions: matrix.num_regions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_metrics_over_full_matrix() {
        let matrix = ConnectivityMatrix::try_new(array![[1.0, -0.5], [-0.5, 0.0]]).unwrap();
        let metrics = ConnectivityMetrics::from_matrix(&matrix);

        assert_eq!(metrics.num_regions, 2);
        assert!((metrics.mean_connectivity - 0.0).abs() < 1e-12);
        // population std of [1, -0.5, -0.5, 0]
        assert!((metrics.std_connectivity - 0.375f64.sqrt()).abs() < 1e-12);
        assert_eq!(metrics.max_connectivity, 1.0);
        assert_eq!(metrics.min_connectivity, -0.5);
    }

    #[test]
    fn test_metrics_json_keys() {
        let matrix = ConnectivityMatrix::try_new(array![[0.25]]).unwrap();
        let json = serde_json::to_value(ConnectivityMetrics::from_matrix(&matrix)).unwrap();
        for key in [
            "mean_connectivity",
            "std_connectivity",
            "max_connectivity",
            "min_connectivity",
            "num_regions",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["std_connectivity"], 0.0);
    }
}
