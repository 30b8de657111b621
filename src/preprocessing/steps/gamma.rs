use image::{Rgba, RgbaImage};

/// Apply gamma correction: v' = 255 * (v / 255)^(1 / gamma)
/// With gamma < 1 mid-tones darken, so faint pencil strokes separate from paper.
/// Alpha passes through unchanged.
pub fn apply(image: &RgbaImage, gamma: f32) -> RgbaImage {
    let lut = build_lut(gamma);
    let (width, height) = image.dimensions();

    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        Rgba([lut[r as usize], lut[g as usize], lut[b as usize], a])
    })
}

/// Every channel value maps independently, so a 256-entry table covers the image
fn build_lut(gamma: f32) -> [u8; 256] {
    let exponent = 1.0 / gamma as f64;
    let mut lut = [0u8; 256];
    for (v, out) in lut.iter_mut().enumerate() {
        let corrected = 255.0 * (v as f64 / 255.0).powf(exponent);
        *out = corrected.round().clamp(0.0, 255.0) as u8;
    }
    lut
}
