use super::luminance::LuminanceBuffer;
use image::{Rgba, RgbaImage};

/// Adaptive threshold parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdParams {
    /// Half-window is width / window_divisor ...
    pub window_divisor: u32,
    /// ... but never smaller than this
    pub min_window: u32,
    /// Subtracted from the local mean before comparing
    pub bias: f32,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self {
            window_divisor: 40,
            min_window: 10,
            bias: 8.0,
        }
    }
}

impl ThresholdParams {
    pub fn half_window(&self, width: u32) -> u32 {
        self.min_window.max(width / self.window_divisor.max(1))
    }
}

/// Summed-area table over a luminance plane
///
/// Cell (x, y) holds the sum of every luminance value in the rectangle from
/// (0, 0) to (x, y) inclusive, so any axis-aligned window sum costs four lookups.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    sums: Vec<f64>,
}

impl IntegralImage {
    /// Build in one pass: running row sum plus the cell directly above
    pub fn from_luminance(plane: &LuminanceBuffer) -> Self {
        let (width, height) = (plane.width() as usize, plane.height() as usize);
        let values = plane.as_slice();
        let mut sums = vec![0.0f64; width * height];

        for y in 0..height {
            let mut row_sum = 0.0f64;
            for x in 0..width {
                let idx = y * width + x;
                row_sum += values[idx] as f64;
                sums[idx] = if y == 0 {
                    row_sum
                } else {
                    sums[idx - width] + row_sum
                };
            }
        }

        Self {
            width: plane.width(),
            height: plane.height(),
            sums,
        }
    }

    #[inline]
    fn at(&self, x: u32, y: u32) -> f64 {
        self.sums[y as usize * self.width as usize + x as usize]
    }

    /// Sum and pixel count of the window (x0, y0)..=(x1, y1), clipped to the image
    pub fn window_sum(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> (f64, u64) {
        let left = x0.max(0) as u32;
        let top = y0.max(0) as u32;
        let right = x1.min(self.width as i64 - 1) as u32;
        let bottom = y1.min(self.height as i64 - 1) as u32;

        // Sum = D - B - C + A
        let d = self.at(right, bottom);
        let b = if top > 0 { self.at(right, top - 1) } else { 0.0 };
        let c = if left > 0 { self.at(left - 1, bottom) } else { 0.0 };
        let a = if left > 0 && top > 0 {
            self.at(left - 1, top - 1)
        } else {
            0.0
        };

        let count = (right - left + 1) as u64 * (bottom - top + 1) as u64;
        (d - b - c + a, count)
    }
}

/// Binarize with a local-mean threshold computed from an integral image
///
/// A pixel is paper (255) when its luminance exceeds `max(mean - bias, 0)` over
/// the square window centred on it, otherwise ink (0). The zero floor keeps
/// fully black pixels as ink regardless of their surroundings. Output is
/// R = G = B in {0, 255} with alpha 255. Total cost is O(W*H) for any window size.
pub fn apply(image: &RgbaImage, params: &ThresholdParams) -> RgbaImage {
    let (width, height) = image.dimensions();
    let plane = LuminanceBuffer::from_rgba(image);
    let integral = IntegralImage::from_luminance(&plane);
    let half = params.half_window(width) as i64;
    let bias = params.bias as f64;

    RgbaImage::from_fn(width, height, |x, y| {
        let (cx, cy) = (x as i64, y as i64);
        let (sum, count) = integral.window_sum(cx - half, cy - half, cx + half, cy + half);
        let mean = sum / count as f64;

        let threshold = (mean - bias).max(0.0);
        let value = if plane.get(x, y) as f64 > threshold {
            255u8
        } else {
            0u8
        };
        Rgba([value, value, value, 255])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gray(v: u8) -> Rgba<u8> {
        Rgba([v, v, v, 255])
    }

    #[test]
    fn test_integral_window_sum_matches_naive_sum() {
        let img = RgbaImage::from_fn(9, 7, |x, y| gray(((x * 13 + y * 29) % 256) as u8));
        let plane = LuminanceBuffer::from_rgba(&img);
        let integral = IntegralImage::from_luminance(&plane);

        for &(x0, y0, x1, y1) in &[(0, 0, 8, 6), (2, 1, 5, 4), (-3, -3, 1, 1), (6, 5, 20, 20)] {
            let (sum, count) = integral.window_sum(x0, y0, x1, y1);

            let mut naive = 0.0f64;
            let mut naive_count = 0u64;
            for y in y0.max(0)..=y1.min(6) {
                for x in x0.max(0)..=x1.min(8) {
                    naive += plane.get(x as u32, y as u32) as f64;
                    naive_count += 1;
                }
            }

            assert!((sum - naive).abs() < 1e-6, "window ({x0},{y0})-({x1},{y1})");
            assert_eq!(count, naive_count);
        }
    }

    #[test]
    fn test_half_window_scales_with_width() {
        let params = ThresholdParams::default();
        assert_eq!(params.half_window(200), 10);
        assert_eq!(params.half_window(1024), 25);
    }

    #[test]
    fn test_threshold_uniform_white_stays_white() {
        let img = RgbaImage::from_pixel(40, 30, gray(255));
        let result = apply(&img, &ThresholdParams::default());
        assert!(result.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn test_threshold_uniform_black_stays_black() {
        let img = RgbaImage::from_pixel(40, 30, gray(0));
        let result = apply(&img, &ThresholdParams::default());
        assert!(result.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn test_threshold_handles_text_pattern() {
        // Create dark text on light background
        let mut img = RgbaImage::from_pixel(50, 20, gray(240));
        for x in 10..40 {
            img.put_pixel(x, 10, gray(20)); // dark text
        }

        let result = apply(&img, &ThresholdParams::default());

        // Text pixels should be black (0)
        assert_eq!(result.get_pixel(25, 10).0[0], 0);
        // Background should be white (255)
        assert_eq!(result.get_pixel(25, 5).0[0], 255);
    }

    #[test]
    fn test_threshold_tolerates_uneven_lighting() {
        // Background brightens left to right; a stroke sits in both halves
        let mut img = RgbaImage::from_fn(120, 40, |x, _| gray((80 + x) as u8));
        for x in 0..120 {
            let v = img.get_pixel(x, 20).0[0];
            img.put_pixel(x, 20, gray(v - 50));
        }

        let result = apply(&img, &ThresholdParams::default());

        assert_eq!(result.get_pixel(10, 20).0[0], 0);
        assert_eq!(result.get_pixel(110, 20).0[0], 0);
        assert_eq!(result.get_pixel(10, 5).0[0], 255);
        assert_eq!(result.get_pixel(110, 35).0[0], 255);
    }

    proptest! {
        #[test]
        fn prop_threshold_output_is_binary_and_idempotent(
            values in proptest::collection::vec(any::<u8>(), 24 * 16)
        ) {
            let img = RgbaImage::from_fn(24, 16, |x, y| gray(values[(y * 24 + x) as usize]));
            let params = ThresholdParams::default();

            let once = apply(&img, &params);
            for p in once.pixels() {
                prop_assert!(p.0[0] == 0 || p.0[0] == 255);
                prop_assert_eq!(p.0[0], p.0[1]);
                prop_assert_eq!(p.0[1], p.0[2]);
                prop_assert_eq!(p.0[3], 255);
            }

            let twice = apply(&once, &params);
            prop_assert_eq!(once, twice);
        }
    }
}
