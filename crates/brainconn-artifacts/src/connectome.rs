// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Orthographic connectome: region centroids as nodes, strongest connections as edges

use crate::colormap::connectivity_color;
use crate::raster::{Canvas, BLACK, GREY, WHITE};
use brainconn_structures::{ConnectivityError, ConnectivityMatrix, ConnectivityResult};

/// One drawn connection between regions `a < b`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectomeEdge {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

/// Projection panels, left to right: (horizontal axis, vertical axis) in world space
const PANELS: [(usize, usize); 3] = [
    (1, 2), // sagittal: y right, z up
    (0, 2), // coronal: x right, z up
    (0, 1), // axial: x right, y up
];

/// Linear-interpolated percentile of an ascending slice
fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> f64 {
    let rank = (percentile / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Off-diagonal pairs whose |weight| is at or above the given percentile of
/// all off-diagonal |weights|, weakest first so strong edges draw on top.
pub fn select_top_edges(matrix: &ConnectivityMatrix, percentile: f64) -> Vec<ConnectomeEdge> {
    let mut magnitudes: Vec<f64> = matrix.upper_triangle().map(|(_, _, w)| w.abs()).collect();
    if magnitudes.is_empty() {
        return Vec::new();
    }
    magnitudes.sort_by(|a, b| a.total_cmp(b));
    let threshold = percentile_of_sorted(&magnitudes, percentile);

    let mut edges: Vec<ConnectomeEdge> = matrix
        .upper_triangle()
        .filter(|(_, _, w)| w.abs() >= threshold)
        .map(|(a, b, weight)| ConnectomeEdge { a, b, weight })
        .collect();
    edges.sort_by(|x, y| x.weight.abs().total_cmp(&y.weight.abs()));
    edges
}

/// Shared world-to-panel mapping so all three views use one scale
struct Projection {
    center: [f64; 3],
    scale: f64,
    panel_size: i64,
}

impl Projection {
    fn fit(centroids: &[[f64; 3]], panel_size: u32) -> Self {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for point in centroids {
            for axis in 0..3 {
                min[axis] = min[axis].min(point[axis]);
                max[axis] = max[axis].max(point[axis]);
            }
        }
        let mut center = [0.0; 3];
        let mut extent: f64 = 0.0;
        for axis in 0..3 {
            center[axis] = (min[axis] + max[axis]) / 2.0;
            extent = extent.max(max[axis] - min[axis]);
        }
        if !extent.is_finite() || extent <= 0.0 {
            extent = 1.0;
        }
        let padding = (panel_size as f64 * 0.1).max(4.0);
        Self {
            center,
            scale: (panel_size as f64 - 2.0 * padding).max(1.0) / extent,
            panel_size: panel_size as i64,
        }
    }

    fn to_pixel(&self, point: &[f64; 3], panel: usize) -> (i64, i64) {
        let (h, v) = PANELS[panel];
        let half = self.panel_size as f64 / 2.0;
        let x = panel as f64 * self.panel_size as f64
            + half
            + (point[h] - self.center[h]) * self.scale;
        let y = half - (point[v] - self.center[v]) * self.scale;
        (x.round() as i64, y.round() as i64)
    }
}

/// Render sagittal, coronal and axial projections side by side.
///
/// `centroids` are region centres in world millimetres, one per matrix row.
pub fn render_connectome(
    matrix: &ConnectivityMatrix,
    centroids: &[[f64; 3]],
    panel_size: u32,
    edge_percentile: f64,
) -> ConnectivityResult<Canvas> {
    if centroids.len() != matrix.num_regions() {
        return Err(ConnectivityError::Artifact(format!(
            "{} centroids for a {}-region matrix",
            centroids.len(),
            matrix.num_regions()
        )));
    }
    if panel_size < 16 {
        return Err(ConnectivityError::Artifact(format!(
            "connectome panel size {} is too small",
            panel_size
        )));
    }

    let mut canvas = Canvas::new(panel_size * 3, panel_size, WHITE);
    let projection = Projection::fit(centroids, panel_size);
    let edges = select_top_edges(matrix, edge_percentile);
    let node_radius = (panel_size as i64 / 80).max(3);
    let thickness = (panel_size / 200).max(1);

    for panel in 0..PANELS.len() {
        let origin = panel as i64 * panel_size as i64;
        canvas.stroke_rect(origin, 0, panel_size as i64, panel_size as i64, GREY);

        for edge in &edges {
            let from = projection.to_pixel(&centroids[edge.a], panel);
            let to = projection.to_pixel(&centroids[edge.b], panel);
            canvas.draw_line(from, to, thickness, connectivity_color(edge.weight));
        }
        for centroid in centroids {
            let at = projection.to_pixel(centroid, panel);
            canvas.fill_circle(at, node_radius + 1, BLACK);
            canvas.fill_circle(at, node_radius, GREY);
        }
    }

    Ok(canvas)
}
