use super::luminance::luma;
use image::{Rgba, RgbaImage};

/// 256-bin luminance histogram
#[derive(Debug, Clone)]
pub struct Histogram {
    counts: [u32; 256],
}

impl Histogram {
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let mut counts = [0u32; 256];
        for pixel in image.pixels() {
            counts[rounded_luma(pixel) as usize] += 1;
        }
        Self { counts }
    }

    /// Cumulative distribution: cdf[i] = number of pixels with luminance <= i
    pub fn cdf(&self) -> [u32; 256] {
        let mut cdf = [0u32; 256];
        let mut running = 0u32;
        for (bin, count) in cdf.iter_mut().zip(self.counts.iter()) {
            running += count;
            *bin = running;
        }
        cdf
    }
}

/// Apply histogram equalization on luminance
/// Output is grayscale (R = G = B); alpha passes through.
pub fn apply(image: &RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();
    let total = width as u64 * height as u64;

    let cdf = Histogram::from_rgba(image).cdf();
    let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0) as u64;

    let mut lut = [0u8; 256];
    for (lum, out) in lut.iter_mut().enumerate() {
        *out = if total == cdf_min {
            // Single-valued image, nothing to spread
            lum as u8
        } else {
            let above_min = (cdf[lum] as u64).saturating_sub(cdf_min) as f64;
            let spread = above_min / (total - cdf_min) as f64;
            (spread * 255.0).round().clamp(0.0, 255.0) as u8
        };
    }

    RgbaImage::from_fn(width, height, |x, y| {
        let pixel = image.get_pixel(x, y);
        let value = lut[rounded_luma(pixel) as usize];
        Rgba([value, value, value, pixel.0[3]])
    })
}

#[inline]
fn rounded_luma(pixel: &Rgba<u8>) -> u8 {
    luma(pixel.0[0], pixel.0[1], pixel.0[2]).round().clamp(0.0, 255.0) as u8
}
