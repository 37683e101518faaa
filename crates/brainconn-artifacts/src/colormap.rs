// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Diverging blue-white-red colour scale

use image::Rgb;

/// Evenly spaced anchors of the "coolwarm" diverging map, blue to red
const COOLWARM_ANCHORS: [[u8; 3]; 9] = [
    [59, 76, 192],
    [98, 130, 234],
    [141, 176, 254],
    [184, 208, 249],
    [221, 221, 221],
    [245, 196, 173],
    [244, 154, 123],
    [222, 96, 77],
    [180, 4, 38],
];

/// Colour for `value` on a coolwarm scale spanning `[vmin, vmax]`.
///
/// Values outside the range are clamped; NaN maps to the neutral midpoint.
pub fn coolwarm(value: f64, vmin: f64, vmax: f64) -> Rgb<u8> {
    let span = vmax - vmin;
    let t = if value.is_nan() || span <= 0.0 {
        0.5
    } else {
        ((value - vmin) / span).clamp(0.0, 1.0)
    };

    let last = COOLWARM_ANCHORS.len() - 1;
    let position = t * last as f64;
    let lower = (position.floor() as usize).min(last - 1);
    let frac = position - lower as f64;

    let a = COOLWARM_ANCHORS[lower];
    let b = COOLWARM_ANCHORS[lower + 1];
    let mut rgb = [0u8; 3];
    for channel in 0..3 {
        let mixed = a[channel] as f64 + (b[channel] as f64 - a[channel] as f64) * frac;
        rgb[channel] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    Rgb(rgb)
}

/// Coolwarm on the fixed connectivity range `[-1, 1]`
pub fn connectivity_color(weight: f64) -> Rgb<u8> {
    coolwarm(weight, -1.0, 1.0)
}
