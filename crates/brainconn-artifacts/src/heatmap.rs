// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Connectivity matrix heatmap with a vertical colour bar

use crate::colormap::connectivity_color;
use crate::raster::{Canvas, BLACK, WHITE};
use brainconn_structures::{ConnectivityError, ConnectivityMatrix, ConnectivityResult};

/// Pixel layout of a heatmap image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatmapLayout {
    pub margin: i64,
    /// Side of the square matrix area
    pub side: i64,
    pub bar_x: i64,
    pub bar_width: i64,
    pub tick_len: i64,
}

impl HeatmapLayout {
    pub fn new(width: u32, height: u32) -> ConnectivityResult<Self> {
        let (width, height) = (width as i64, height as i64);
        let margin = (width.max(height) / 25).max(8);
        let bar_width = (width / 40).max(8);
        let gap = bar_width;
        let tick_len = bar_width / 2;
        let side = (width - 2 * margin - gap - bar_width - tick_len).min(height - 2 * margin);
        if side < 2 {
            return Err(ConnectivityError::Artifact(format!(
                "heatmap size {}x{} leaves no room for the matrix",
                width, height
            )));
        }
        Ok(Self {
            margin,
            side,
            bar_x: margin + side + gap,
            bar_width,
            tick_len,
        })
    }
}

/// Draw the matrix as coloured cells on a fixed `[-1, 1]` coolwarm scale.
///
/// Row `i` runs top to bottom, column `j` left to right.
pub fn render_heatmap(
    matrix: &ConnectivityMatrix,
    width: u32,
    height: u32,
) -> ConnectivityResult<Canvas> {
    let layout = HeatmapLayout::new(width, height)?;
    let n = matrix.num_regions() as i64;
    let mut canvas = Canvas::new(width, height, WHITE);
    let HeatmapLayout {
        margin,
        side,
        bar_x,
        bar_width,
        tick_len,
    } = layout;

    for py in 0..side {
        let i = (py * n / side) as usize;
        for px in 0..side {
            let j = (px * n / side) as usize;
            canvas.put(margin + px, margin + py, connectivity_color(matrix.get(i, j)));
        }
    }
    canvas.stroke_rect(margin - 1, margin - 1, side + 2, side + 2, BLACK);

    // Colour bar: +1 at the top, -1 at the bottom
    for py in 0..side {
        let value = 1.0 - 2.0 * py as f64 / (side - 1) as f64;
        canvas.fill_rect(bar_x, margin + py, bar_width, 1, connectivity_color(value));
    }
    canvas.stroke_rect(bar_x - 1, margin - 1, bar_width + 2, side + 2, BLACK);
    for tick_y in [margin, margin + (side - 1) / 2, margin + side - 1] {
        canvas.fill_rect(bar_x + bar_width + 1, tick_y, tick_len, 1, BLACK);
    }

    Ok(canvas)
}
