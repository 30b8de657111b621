use image::{Rgba, RgbaImage};

/// Laplacian-based sharpening kernel
/// Center weight 5, neighbors -1 each = edge enhancement
pub const SHARPEN_KERNEL: [[f32; 3]; 3] = [[0.0, -1.0, 0.0], [-1.0, 5.0, -1.0], [0.0, -1.0, 0.0]];

/// Apply the sharpening kernel to R, G and B, clamped to 0..=255
/// Taps that fall outside the image are dropped rather than zero-padded, so the
/// effective kernel sum differs along the margins. Alpha passes through.
pub fn apply(image: &RgbaImage) -> RgbaImage {
    let (width, height) = image.dimensions();

    RgbaImage::from_fn(width, height, |x, y| {
        let mut acc = [0.0f32; 3];

        for (ky, row) in SHARPEN_KERNEL.iter().enumerate() {
            for (kx, &weight) in row.iter().enumerate() {
                if weight == 0.0 {
                    continue;
                }
                let (Some(nx), Some(ny)) = (
                    (x + kx as u32).checked_sub(1),
                    (y + ky as u32).checked_sub(1),
                ) else {
                    continue;
                };
                if nx >= width || ny >= height {
                    continue;
                }
                let sample = image.get_pixel(nx, ny).0;
                for (channel, total) in acc.iter_mut().enumerate() {
                    *total += sample[channel] as f32 * weight;
                }
            }
        }

        let [r, g, b] = acc.map(|v| v.round().clamp(0.0, 255.0) as u8);
        Rgba([r, g, b, image.get_pixel(x, y).0[3]])
    })
}
