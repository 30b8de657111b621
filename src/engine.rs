use crate::codec;
use crate::error::EnhanceError;
use crate::preprocessing::steps::resize;
use crate::preprocessing::{Pipeline, PipelineParams, StepTiming};
use serde::Serialize;
use std::time::Instant;

/// Both renditions of one enhanced page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedPage {
    /// Resized but otherwise untouched page, base64 without data-URL prefix
    pub original_base64: String,
    /// Type `original_base64` was actually encoded as
    pub original_mime_type: String,
    /// Enhanced binary page, JPEG, base64 without data-URL prefix
    pub processed_base64: String,
    pub width: u32,
    pub height: u32,
    /// Rotation applied to the enhanced page, in degrees clockwise
    pub skew_angle: i32,
    pub steps: Vec<StepTiming>,
    pub processing_time_ms: u64,
}

/// Turns one rasterized page into its original and enhanced renditions
pub struct Enhancer {
    pipeline: Pipeline,
}

impl Enhancer {
    pub fn new(params: PipelineParams) -> Result<Self, EnhanceError> {
        params.validate()?;
        Ok(Self {
            pipeline: Pipeline::new(params),
        })
    }

    pub fn params(&self) -> &PipelineParams {
        self.pipeline.params()
    }

    /// Decode, resize, enhance and encode a single page
    ///
    /// Any failure aborts the page; no partial output is produced.
    pub fn enhance(&self, bytes: &[u8], mime_type: &str) -> Result<EnhancedPage, EnhanceError> {
        let start = Instant::now();
        let mut steps = Vec::new();

        let decoded = timed("decode", &mut steps, || codec::decode(bytes, mime_type))?;
        tracing::debug!(
            "Decoded {:?} page {}x{}",
            decoded.format,
            decoded.image.width(),
            decoded.image.height()
        );

        let max_long_edge = self.params().max_long_edge;
        let resized = timed("resize", &mut steps, || {
            resize::apply(&decoded.image, max_long_edge)
        })?;
        drop(decoded);

        let (original_base64, original_mime_type) = timed("encode_original", &mut steps, || {
            codec::encode_original(&resized, mime_type)
        })?;

        let enhanced = self.pipeline.process(&resized)?;
        steps.extend(enhanced.steps);

        let jpeg_quality = self.params().jpeg_quality;
        let processed_base64 = timed("encode_processed", &mut steps, || {
            codec::encode_processed(&enhanced.image, jpeg_quality)
        })?;

        let page = EnhancedPage {
            original_base64,
            original_mime_type: original_mime_type.to_string(),
            processed_base64,
            width: resized.width(),
            height: resized.height(),
            skew_angle: enhanced.skew_angle,
            steps,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Enhanced page {}x{} in {}ms, skew {} degrees",
            page.width,
            page.height,
            page.processing_time_ms,
            page.skew_angle
        );

        Ok(page)
    }
}

fn timed<T, F>(name: &str, timings: &mut Vec<StepTiming>, f: F) -> Result<T, EnhanceError>
where
    F: FnOnce() -> Result<T, EnhanceError>,
{
    let step_start = Instant::now();
    let value = f()?;
    timings.push(StepTiming {
        name: name.to_string(),
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: &RgbaImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn skewed_page(width: u32, height: u32) -> RgbaImage {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([240, 236, 228, 255]));
        let slope = 2f64.to_radians().tan();
        for row in (height / 5..height * 4 / 5).step_by((height / 6).max(4) as usize) {
            for x in width / 10..width * 9 / 10 {
                let y = (row as f64 + x as f64 * slope).round() as u32;
                for dy in 0..2 {
                    if y + dy < height {
                        img.put_pixel(x, y + dy, Rgba([30, 30, 45, 255]));
                    }
                }
            }
        }
        img
    }

    fn decode_base64(data: &str) -> RgbaImage {
        let bytes = general_purpose::STANDARD.decode(data).unwrap();
        image::load_from_memory(&bytes).unwrap().into_rgba8()
    }

    #[test]
    fn test_enhance_png_page() {
        let enhancer = Enhancer::new(PipelineParams::default()).unwrap();
        let bytes = encode(&skewed_page(300, 200), ImageFormat::Png);

        let page = enhancer.enhance(&bytes, "image/png").unwrap();

        assert_eq!((page.width, page.height), (300, 200));
        assert_eq!(page.original_mime_type, "image/png");
        assert!(page.skew_angle != 0 && (-5..=5).contains(&page.skew_angle));

        let original = decode_base64(&page.original_base64);
        assert_eq!(original.dimensions(), (300, 200));

        let processed = decode_base64(&page.processed_base64);
        assert_eq!(processed.dimensions(), (300, 200));
        assert!(processed.pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn test_enhance_caps_long_edge() {
        let enhancer = Enhancer::new(PipelineParams {
            max_long_edge: 128,
            ..PipelineParams::default()
        })
        .unwrap();
        let bytes = encode(&skewed_page(400, 200), ImageFormat::Png);

        let page = enhancer.enhance(&bytes, "image/png").unwrap();

        assert_eq!((page.width, page.height), (128, 64));
        assert_eq!(decode_base64(&page.original_base64).dimensions(), (128, 64));
        assert_eq!(decode_base64(&page.processed_base64).dimensions(), (128, 64));
    }

    #[test]
    fn test_enhance_keeps_jpeg_source_type() {
        let enhancer = Enhancer::new(PipelineParams::default()).unwrap();
        let rgb = image::DynamicImage::ImageRgba8(skewed_page(120, 90)).into_rgb8();
        let mut buf = Cursor::new(Vec::new());
        rgb.write_to(&mut buf, ImageFormat::Jpeg).unwrap();

        let page = enhancer.enhance(buf.get_ref(), "image/jpeg").unwrap();

        assert_eq!(page.original_mime_type, "image/jpeg");
        let bytes = general_purpose::STANDARD.decode(&page.original_base64).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_enhance_rejects_non_image() {
        let enhancer = Enhancer::new(PipelineParams::default()).unwrap();
        assert!(matches!(
            enhancer.enhance(b"", "image/png"),
            Err(EnhanceError::Decode(_))
        ));
        assert!(matches!(
            enhancer.enhance(b"%PDF-1.7 not a raster", "application/pdf"),
            Err(EnhanceError::Decode(_))
        ));
    }

    #[test]
    fn test_enhance_rejects_single_pixel_row() {
        let enhancer = Enhancer::new(PipelineParams::default()).unwrap();
        let bytes = encode(&RgbaImage::from_pixel(50, 1, Rgba([0, 0, 0, 255])), ImageFormat::Png);
        assert!(matches!(
            enhancer.enhance(&bytes, "image/png"),
            Err(EnhanceError::Decode(_))
        ));
    }

    #[test]
    fn test_enhanced_page_serializes_camel_case() {
        let enhancer = Enhancer::new(PipelineParams::default()).unwrap();
        let bytes = encode(&skewed_page(40, 40), ImageFormat::Png);
        let page = enhancer.enhance(&bytes, "image/png").unwrap();

        let json = serde_json::to_value(&page).unwrap();

        assert!(json.get("originalBase64").is_some());
        assert!(json.get("processedBase64").is_some());
        assert!(json.get("skewAngle").is_some());
    }
}
