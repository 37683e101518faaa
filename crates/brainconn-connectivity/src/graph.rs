// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Correlation graph between regions

use ndarray::{Array2, Axis};
use serde::Serialize;

/// Edges connect regions whose |Pearson r| is strictly greater than this
pub const CORRELATION_THRESHOLD: f64 = 0.3;

/// Directed edge list; every undirected edge appears once in each direction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeIndex {
    edges: Vec<(usize, usize)>,
}

impl EdgeIndex {
    pub fn new(edges: Vec<(usize, usize)>) -> Self {
        Self { edges }
    }

    /// `(source, target)` pairs
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Pairwise Pearson correlation between rows.
///
/// Pairs involving a constant row (undefined correlation) are 0.0, including
/// that row's diagonal entry.
pub fn pearson_correlation(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let cols = data.ncols() as f64;
    let mut centered = data.to_owned();
    for mut row in centered.axis_iter_mut(Axis(0)) {
        let mean = if cols > 0.0 { row.sum() / cols } else { 0.0 };
        row.mapv_inplace(|v| v - mean);
    }
    let norms: Vec<f64> = centered
        .axis_iter(Axis(0))
        .map(|row| row.dot(&row).sqrt())
        .collect();
    let products = centered.dot(&centered.t());

    let mut corr = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in i..n {
            let denom = norms[i] * norms[j];
            let r = products[[i, j]] / denom;
            let r = if r.is_finite() && denom > 0.0 {
                r.clamp(-1.0, 1.0)
            } else {
                0.0
            };
            corr[[i, j]] = r;
            corr[[j, i]] = r;
        }
    }
    corr
}

/// Edges `(i, j)`, `i != j`, with `|corr[i, j]| > threshold`
pub fn threshold_edges(corr: &Array2<f64>, threshold: f64) -> EdgeIndex {
    let n = corr.nrows();
    let mut edges = Vec::new();
    for i in 0..n {
        for j in 0..n {
            if i != j && corr[[i, j]].abs() > threshold {
                edges.push((i, j));
            }
        }
    }
    EdgeIndex::new(edges)
}

/// Correlation graph of a `regions x timepoints` series at [`CORRELATION_THRESHOLD`]
pub fn build_graph(series: &Array2<f64>) -> EdgeIndex {
    threshold_edges(&pearson_correlation(series), CORRELATION_THRESHOLD)
}
