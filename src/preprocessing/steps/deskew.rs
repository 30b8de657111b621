use super::luminance::luma;
use crate::error::EnhanceError;
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

/// Luminance below this counts as ink when building projection profiles
const INK_LEVEL: f32 = 128.0;

/// Skew search parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkewSearch {
    /// Candidates are -max_degrees..=max_degrees in 1 degree steps
    pub max_degrees: i32,
    /// 0 degrees is skipped unless this is set
    pub include_zero: bool,
    /// Sample every n-th pixel in both axes
    pub sample_stride: usize,
}

impl Default for SkewSearch {
    fn default() -> Self {
        Self {
            max_degrees: 5,
            include_zero: false,
            sample_stride: 4,
        }
    }
}

impl SkewSearch {
    pub fn candidates(&self) -> impl Iterator<Item = i32> + '_ {
        (-self.max_degrees..=self.max_degrees).filter(|&angle| angle != 0 || self.include_zero)
    }
}

/// Estimate skew in whole degrees using projection profile variance
///
/// The angle whose row projection has the highest variance wins: aligned text
/// collapses into sharp bands. Ties keep the earlier candidate, and the first
/// candidate is the fallback for pages without ink.
pub fn estimate_skew_angle(image: &RgbaImage, search: &SkewSearch) -> i32 {
    let mut candidates = search.candidates();
    let Some(first) = candidates.next() else {
        return 0;
    };

    let mut best_angle = first;
    let mut best_variance = projection_variance(image, first, search.sample_stride);

    for angle in candidates {
        let variance = projection_variance(image, angle, search.sample_stride);
        tracing::trace!(angle, variance, "skew candidate");
        if variance > best_variance {
            best_variance = variance;
            best_angle = angle;
        }
    }

    best_angle
}

/// Variance of the ink projection onto rows after rotating by `degrees`
fn projection_variance(image: &RgbaImage, degrees: i32, stride: usize) -> f64 {
    let (width, height) = image.dimensions();
    let radians = (degrees as f64).to_radians();
    let (sin_a, cos_a) = radians.sin_cos();

    let mut row_counts = vec![0u32; height as usize];

    for y in (0..height).step_by(stride.max(1)) {
        for x in (0..width).step_by(stride.max(1)) {
            let projected = (x as f64 * sin_a + y as f64 * cos_a).floor();
            if projected < 0.0 || projected >= height as f64 {
                continue;
            }
            let [r, g, b, _] = image.get_pixel(x, y).0;
            if luma(r, g, b) < INK_LEVEL {
                row_counts[projected as usize] += 1;
            }
        }
    }

    let n = row_counts.len() as f64;
    let (sum, sum_sq) = row_counts.iter().fold((0.0f64, 0.0f64), |(s, sq), &c| {
        let c = c as f64;
        (s + c, sq + c * c)
    });
    let mean = sum / n;
    sum_sq / n - mean * mean
}

/// Rotate the page clockwise by `degrees` about its centre onto a white canvas
/// Nearest-neighbour sampling keeps a binarized page binary.
pub fn rotate_onto_white(image: &RgbaImage, degrees: i32) -> Result<RgbaImage, EnhanceError> {
    let (width, height) = image.dimensions();
    let canvas = white_canvas(width, height)?;

    if degrees == 0 {
        return Ok(composite_opaque(canvas, image));
    }

    let rotated = rotate_about_center(
        image,
        (degrees as f32).to_radians(),
        Interpolation::Nearest,
        Rgba([255, 255, 255, 255]),
    );
    Ok(composite_opaque(canvas, &rotated))
}

fn white_canvas(width: u32, height: u32) -> Result<RgbaImage, EnhanceError> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| {
            EnhanceError::SurfaceUnavailable(format!("canvas {}x{} overflows", width, height))
        })?;
    RgbaImage::from_raw(width, height, vec![255u8; len])
        .ok_or_else(|| EnhanceError::SurfaceUnavailable(format!("canvas {}x{}", width, height)))
}

/// Alpha-blend `layer` over an opaque canvas; the result is opaque everywhere
fn composite_opaque(mut canvas: RgbaImage, layer: &RgbaImage) -> RgbaImage {
    for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
        let alpha = src.0[3] as u32;
        for channel in 0..3 {
            let blended =
                (src.0[channel] as u32 * alpha + dst.0[channel] as u32 * (255 - alpha) + 127) / 255;
            dst.0[channel] = blended as u8;
        }
        dst.0[3] = 255;
    }
    canvas
}
