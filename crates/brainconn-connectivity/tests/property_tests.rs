// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for the numeric stages

use brainconn_connectivity::{
    build_graph, pearson_correlation, zscore_rows, ConnectivityModel, CORRELATION_THRESHOLD,
};
use brainconn_serialization::GcnShape;
use ndarray::Array2;
use proptest::prelude::*;

/// `rows x cols` matrix with values in a realistic signal range
fn signal_matrix(rows: usize, cols: usize) -> impl Strategy<Value = Array2<f64>> {
    prop::collection::vec(-1000.0f64..1000.0, rows * cols).prop_map(move |values| {
        Array2::from_shape_vec((rows, cols), values).expect("length matches shape")
    })
}

fn sized_signal() -> impl Strategy<Value = Array2<f64>> {
    (1usize..8, 2usize..40).prop_flat_map(|(rows, cols)| signal_matrix(rows, cols))
}

proptest! {
    #[test]
    fn prop_zscore_rows_are_normalised_or_zero(mut data in sized_signal()) {
        zscore_rows(&mut data);
        let n = data.ncols() as f64;
        for row in data.rows() {
            prop_assert!(row.iter().all(|v| v.is_finite()));
            if row.iter().all(|&v| v == 0.0) {
                continue;
            }
            let mean = row.sum() / n;
            let var = row.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            prop_assert!(mean.abs() < 1e-9);
            prop_assert!((var - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_constant_rows_become_zero(value in -1e6f64..1e6, cols in 2usize..30) {
        let mut data = Array2::from_elem((1, cols), value);
        zscore_rows(&mut data);
        prop_assert!(data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn prop_graph_respects_threshold(data in sized_signal()) {
        let corr = pearson_correlation(&data);
        let edges = build_graph(&data);
        let set: std::collections::HashSet<_> = edges.pairs().iter().copied().collect();

        for &(i, j) in edges.pairs() {
            prop_assert_ne!(i, j);
            prop_assert!(corr[[i, j]].abs() > CORRELATION_THRESHOLD);
            prop_assert!(set.contains(&(j, i)));
        }
        for ((i, j), r) in corr.indexed_iter() {
            prop_assert!(r.is_finite() && r.abs() <= 1.0);
            if i != j && r.abs() > CORRELATION_THRESHOLD {
                prop_assert!(set.contains(&(i, j)));
            }
        }
    }

    #[test]
    fn prop_model_output_symmetric_and_bounded(
        (data, seed) in (2usize..6, 2usize..12)
            .prop_flat_map(|(rows, cols)| signal_matrix(rows, cols))
            .prop_flat_map(|data| (Just(data), any::<u64>()))
    ) {
        let mut features = data;
        zscore_rows(&mut features);
        let shape = GcnShape {
            num_regions: features.nrows(),
            num_features: features.ncols(),
            hidden_dim: 6,
        };
        let model = ConnectivityModel::untrained(shape, seed).unwrap();
        let matrix = model.compute(&features, &build_graph(&features)).unwrap();
        let n = matrix.num_regions();

        prop_assert_eq!(n, features.nrows());
        for i in 0..n {
            for j in 0..n {
                prop_assert_eq!(matrix.get(i, j), matrix.get(j, i));
                prop_assert!(matrix.get(i, j).abs() <= 1.0);
            }
        }
    }
}
