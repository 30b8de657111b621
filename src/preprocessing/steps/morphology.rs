//! Morphological cleanup of a binarized page
//!
//! Ink is black (0) on white paper, so growing ink is a *minimum* filter and
//! shrinking ink is a *maximum* filter. Helpers are named by their effect on ink.

use image::{Rgba, RgbaImage};

/// Close small gaps in strokes: grow ink by one pixel, then shrink it back
/// Gaps up to two pixels wide are bridged; stroke thickness is restored.
pub fn apply(image: &RgbaImage) -> RgbaImage {
    let grown = dilate_ink(image);
    erode_ink(&grown)
}

/// 3x3 minimum over the red channel: every pixel touching ink becomes ink
pub fn dilate_ink(image: &RgbaImage) -> RgbaImage {
    filter3x3(image, u8::MAX, u8::min)
}

/// 3x3 maximum over the red channel: ink touching paper becomes paper
pub fn erode_ink(image: &RgbaImage) -> RgbaImage {
    filter3x3(image, u8::MIN, u8::max)
}

/// Channels are equal after binarization; only red is read
fn filter3x3(image: &RgbaImage, identity: u8, fold: fn(u8, u8) -> u8) -> RgbaImage {
    let (width, height) = image.dimensions();

    RgbaImage::from_fn(width, height, |x, y| {
        let mut value = identity;
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                value = fold(value, image.get_pixel(nx, ny).0[0]);
            }
        }
        Rgba([value, value, value, 255])
    })
}
