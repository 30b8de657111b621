use crate::error::EnhanceError;
use image::{imageops::FilterType, RgbaImage};

/// Smallest side the numeric stages accept; below this window means and
/// projection variances degenerate
pub const MIN_SIDE: u32 = 2;

/// Reject images too small to enhance
pub fn ensure_processable(width: u32, height: u32) -> Result<(), EnhanceError> {
    if width < MIN_SIDE || height < MIN_SIDE {
        return Err(EnhanceError::Decode(format!(
            "image is {}x{}, need at least {}x{}",
            width, height, MIN_SIDE, MIN_SIDE
        )));
    }
    Ok(())
}

/// Target dimensions so the long edge never exceeds `max_long_edge`
/// Images already within the cap are never upscaled.
pub fn target_dimensions(width: u32, height: u32, max_long_edge: u32) -> (u32, u32) {
    let long_edge = width.max(height);
    let scale = (max_long_edge as f64 / long_edge as f64).min(1.0);
    if scale >= 1.0 {
        return (width, height);
    }
    (
        (width as f64 * scale).round() as u32,
        (height as f64 * scale).round() as u32,
    )
}

/// Scale the page down to the configured long edge, preserving aspect ratio
pub fn apply(image: &RgbaImage, max_long_edge: u32) -> Result<RgbaImage, EnhanceError> {
    let (width, height) = image.dimensions();
    ensure_processable(width, height)?;

    let (new_width, new_height) = target_dimensions(width, height, max_long_edge);
    if (new_width, new_height) == (width, height) {
        return Ok(image.clone());
    }

    // Extreme aspect ratios can collapse the short side
    ensure_processable(new_width, new_height)?;

    tracing::debug!(
        "Resizing {}x{} -> {}x{}",
        width,
        height,
        new_width,
        new_height
    );
    Ok(image::imageops::resize(
        image,
        new_width,
        new_height,
        FilterType::Lanczos3,
    ))
}
