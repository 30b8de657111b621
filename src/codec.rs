//! Image decoding and the two output encoders
//!
//! Decoding sniffs the real format from the bytes; the declared MIME type only
//! chooses how the unprocessed page is re-encoded.

use crate::error::EnhanceError;
use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;

/// JPEG quality used when the source page itself was a JPEG
pub const ORIGINAL_JPEG_QUALITY: u8 = 92;

/// Formats accepted for decoding, by MIME type
pub const SUPPORTED_FORMATS: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/bmp",
    "image/webp",
    "image/tiff",
];

/// A decoded source page
#[derive(Debug)]
pub struct DecodedImage {
    pub image: RgbaImage,
    pub format: ImageFormat,
}

/// Decode raw bytes into an upright RGBA buffer
///
/// An EXIF orientation tag, when present, is applied so camera photos come out
/// the way they were shot.
pub fn decode(bytes: &[u8], declared_mime: &str) -> Result<DecodedImage, EnhanceError> {
    if bytes.is_empty() {
        return Err(EnhanceError::Decode("empty payload".to_string()));
    }

    let format = image::guess_format(bytes)
        .map_err(|e| EnhanceError::Decode(format!("Unrecognized image data: {}", e)))?;

    if let Some(declared) = ImageFormat::from_mime_type(declared_mime) {
        if declared != format {
            tracing::warn!(
                "Declared type {} does not match detected {:?}, decoding as detected",
                declared_mime,
                format
            );
        }
    }

    let decode_error =
        |e: image::ImageError| EnhanceError::Decode(format!("Failed to decode {:?}: {}", format, e));

    let mut decoder = ImageReader::with_format(Cursor::new(bytes), format)
        .into_decoder()
        .map_err(decode_error)?;
    let orientation = decoder.orientation().unwrap_or_else(|e| {
        tracing::debug!("Ignoring unreadable orientation metadata: {}", e);
        Orientation::NoTransforms
    });

    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
    if orientation != Orientation::NoTransforms {
        tracing::debug!("Applying EXIF orientation {:?}", orientation);
        image.apply_orientation(orientation);
    }

    Ok(DecodedImage {
        image: image.into_rgba8(),
        format,
    })
}

/// Output format for the unprocessed page given the source MIME type
/// Only web-encodable types are kept; everything else becomes PNG.
pub fn original_output_format(declared_mime: &str) -> (ImageFormat, &'static str) {
    match declared_mime.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => (ImageFormat::Jpeg, "image/jpeg"),
        "image/webp" => (ImageFormat::WebP, "image/webp"),
        _ => (ImageFormat::Png, "image/png"),
    }
}

/// Encode the resized, unprocessed page at the source type
pub fn encode_original(
    image: &RgbaImage,
    declared_mime: &str,
) -> Result<(String, &'static str), EnhanceError> {
    let (format, mime) = original_output_format(declared_mime);
    let bytes = match format {
        ImageFormat::Jpeg => encode_jpeg(image, ORIGINAL_JPEG_QUALITY)?,
        other => {
            let mut buf = Cursor::new(Vec::new());
            image
                .write_to(&mut buf, other)
                .map_err(|e| EnhanceError::Encode(format!("{:?}: {}", other, e)))?;
            buf.into_inner()
        }
    };
    Ok((to_base64(&bytes), mime))
}

/// Encode the enhanced page as JPEG
pub fn encode_processed(image: &RgbaImage, quality: u8) -> Result<String, EnhanceError> {
    Ok(to_base64(&encode_jpeg(image, quality)?))
}

/// JPEG has no alpha; the channel is dropped
fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, EnhanceError> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| EnhanceError::Encode(format!("Jpeg: {}", e)))?;
    Ok(bytes)
}

/// Standard alphabet, padded, no data-URL prefix
pub fn to_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn from_base64(data: &str) -> Vec<u8> {
        general_purpose::STANDARD.decode(data).unwrap()
    }

    /// JPEG with an APP1 Exif segment holding only an Orientation entry
    fn jpeg_with_orientation(image: &RgbaImage, orientation: u8) -> Vec<u8> {
        let jpeg = encode_jpeg(image, 95).unwrap();

        // Big-endian TIFF header, one IFD entry: tag 0x0112, SHORT, count 1
        let mut exif = b"Exif\0\0MM\0\x2a\0\0\0\x08\0\x01\x01\x12\0\x03\0\0\0\x01".to_vec();
        exif.extend_from_slice(&[0, orientation, 0, 0, 0, 0, 0, 0]);

        let mut bytes = jpeg[..2].to_vec();
        bytes.extend_from_slice(&[0xFF, 0xE1]);
        bytes.extend_from_slice(&(exif.len() as u16 + 2).to_be_bytes());
        bytes.extend_from_slice(&exif);
        bytes.extend_from_slice(&jpeg[2..]);
        bytes
    }

    #[test]
    fn test_decode_empty_payload_fails_with_decode_error() {
        assert!(matches!(decode(&[], "image/png"), Err(EnhanceError::Decode(_))));
    }

    #[test]
    fn test_decode_garbage_fails_with_decode_error() {
        let garbage = b"definitely not an image, just text";
        assert!(matches!(
            decode(garbage, "image/png"),
            Err(EnhanceError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_truncated_png_fails_with_decode_error() {
        let bytes = png_bytes(&RgbaImage::from_pixel(20, 20, Rgba([9, 9, 9, 255])));
        assert!(matches!(
            decode(&bytes[..bytes.len() / 2], "image/png"),
            Err(EnhanceError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_png_roundtrip_dimensions() {
        let src = RgbaImage::from_pixel(33, 17, Rgba([200, 100, 50, 255]));

        let decoded = decode(&png_bytes(&src), "image/png").unwrap();

        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!(decoded.image, src);
    }

    #[test]
    fn test_decode_sniffs_format_despite_wrong_mime() {
        let src = RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]));
        let decoded = decode(&png_bytes(&src), "image/jpeg").unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
    }

    #[test]
    fn test_decode_applies_exif_orientation() {
        // Dark block in the top-left corner of a 30x20 landscape frame
        let src = RgbaImage::from_fn(30, 20, |x, y| {
            if x < 10 && y < 8 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });

        // 6 = rotate 90 degrees clockwise to display
        let decoded = decode(&jpeg_with_orientation(&src, 6), "image/jpeg").unwrap();

        assert_eq!(decoded.format, ImageFormat::Jpeg);
        assert_eq!(decoded.image.dimensions(), (20, 30));
        assert!(decoded.image.get_pixel(17, 3).0[0] < 100);
        assert!(decoded.image.get_pixel(3, 3).0[0] > 155);
    }

    #[test]
    fn test_decode_without_orientation_keeps_layout() {
        let src = RgbaImage::from_pixel(30, 20, Rgba([255, 255, 255, 255]));
        let decoded = decode(&jpeg_with_orientation(&src, 1), "image/jpeg").unwrap();
        assert_eq!(decoded.image.dimensions(), (30, 20));
    }

    #[test]
    fn test_original_format_falls_back_to_png() {
        assert_eq!(original_output_format("image/gif").1, "image/png");
        assert_eq!(original_output_format("image/JPG").1, "image/jpeg");
        assert_eq!(original_output_format("image/webp").1, "image/webp");
        assert_eq!(original_output_format("application/octet-stream").1, "image/png");
    }

    #[test]
    fn test_encode_original_png_is_lossless() {
        let src = RgbaImage::from_fn(10, 6, |x, y| Rgba([x as u8 * 20, y as u8 * 30, 7, 255]));

        let (data, mime) = encode_original(&src, "image/png").unwrap();

        assert_eq!(mime, "image/png");
        assert!(!data.starts_with("data:"));
        let decoded = image::load_from_memory(&from_base64(&data)).unwrap().into_rgba8();
        assert_eq!(decoded, src);
    }

    #[test]
    fn test_encode_processed_is_opaque_jpeg() {
        let src = RgbaImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });

        let data = encode_processed(&src, 90).unwrap();

        let bytes = from_base64(&data);
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&bytes).unwrap().into_rgba8();
        assert_eq!(decoded.dimensions(), (32, 32));
        assert!(decoded.pixels().all(|p| p.0[3] == 255));
    }
}
