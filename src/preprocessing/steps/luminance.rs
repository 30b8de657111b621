use image::RgbaImage;

/// Rec. 601 luma weights
const RED_WEIGHT: f32 = 0.299;
const GREEN_WEIGHT: f32 = 0.587;
const BLUE_WEIGHT: f32 = 0.114;

/// Perceived brightness of one RGB sample, in 0.0..=255.0
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    RED_WEIGHT * r as f32 + GREEN_WEIGHT * g as f32 + BLUE_WEIGHT * b as f32
}

/// Single-channel brightness plane, row-major, origin top-left
#[derive(Debug, Clone)]
pub struct LuminanceBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl LuminanceBuffer {
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image
            .pixels()
            .map(|p| luma(p.0[0], p.0[1], p.0[2]))
            .collect();
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
