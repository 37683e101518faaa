// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Minimal RGB drawing surface: rectangles, lines, discs, PNG export

use brainconn_structures::{ConnectivityError, ConnectivityResult};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const GREY: Rgb<u8> = Rgb([96, 96, 96]);

/// RGB canvas with clipped drawing primitives
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb<u8>) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, background),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Set one pixel, ignoring coordinates off the canvas
    pub fn put(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if x >= 0 && y >= 0 && (x as u64) < self.width() as u64 && (y as u64) < self.height() as u64 {
            self.image.put_pixel(x as u32, y as u32, color);
        }
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, width: i64, height: i64, color: Rgb<u8>) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width).min(self.width() as i64);
        let y1 = (y + height).min(self.height() as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                self.image.put_pixel(px as u32, py as u32, color);
            }
        }
    }

    /// One-pixel rectangle outline
    pub fn stroke_rect(&mut self, x: i64, y: i64, width: i64, height: i64, color: Rgb<u8>) {
        if width <= 0 || height <= 0 {
            return;
        }
        self.fill_rect(x, y, width, 1, color);
        self.fill_rect(x, y + height - 1, width, 1, color);
        self.fill_rect(x, y, 1, height, color);
        self.fill_rect(x + width - 1, y, 1, height, color);
    }

    /// Bresenham line, `thickness` pixels wide
    pub fn draw_line(&mut self, from: (i64, i64), to: (i64, i64), thickness: u32, color: Rgb<u8>) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        let half = thickness as i64 / 2;

        loop {
            if thickness <= 1 {
                self.put(x, y, color);
            } else {
                self.fill_rect(x - half, y - half, thickness as i64, thickness as i64, color);
            }
            if x == to.0 && y == to.1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    pub fn fill_circle(&mut self, center: (i64, i64), radius: i64, color: Rgb<u8>) {
        let r2 = radius * radius;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= r2 {
                    self.put(center.0 + dx, center.1 + dy, color);
                }
            }
        }
    }

    /// Encode as PNG bytes
    pub fn to_png_bytes(&self) -> ConnectivityResult<Vec<u8>> {
        let dynamic_img = DynamicImage::ImageRgb8(self.image.clone());
        let mut buffer = Vec::new();
        dynamic_img
            .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| ConnectivityError::Artifact(format!("Failed to encode PNG: {}", e)))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawing_is_clipped() {
        let mut canvas = Canvas::new(10, 10, WHITE);
        canvas.fill_rect(-5, -5, 8, 8, BLACK);
        canvas.fill_circle((9, 9), 4, GREY);
        canvas.draw_line((-3, 0), (20, 0), 3, BLACK);

        assert_eq!(*canvas.image().get_pixel(0, 0), BLACK);
        assert_eq!(*canvas.image().get_pixel(2, 2), BLACK);
        assert_eq!(*canvas.image().get_pixel(3, 3), WHITE);
        assert_eq!(*canvas.image().get_pixel(9, 9), GREY);
    }

    #[test]
    fn test_line_reaches_both_ends() {
        let mut canvas = Canvas::new(20, 20, WHITE);
        canvas.draw_line((1, 2), (17, 13), 1, BLACK);
        assert_eq!(*canvas.image().get_pixel(1, 2), BLACK);
        assert_eq!(*canvas.image().get_pixel(17, 13), BLACK);
    }

    #[test]
    fn test_png_signature() {
        let canvas = Canvas::new(4, 3, WHITE);
        let bytes = canvas.to_png_bytes().unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
