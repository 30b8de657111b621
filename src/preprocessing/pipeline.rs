use crate::error::EnhanceError;
use image::RgbaImage;
use serde::Serialize;
use std::time::Instant;

use super::steps;
use super::steps::deskew::SkewSearch;
use super::steps::threshold::ThresholdParams;

/// Tunable constants of the enhancement chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PipelineParams {
    /// Long-edge cap applied by the resizer, in pixels
    pub max_long_edge: u32,
    /// Tone normalization gamma (exponent 1 / gamma)
    pub gamma: f32,
    /// Adaptive threshold half-window = max(min_window, width / window_divisor)
    pub window_divisor: u32,
    pub min_window: u32,
    /// Subtracted from the local mean by the binarizer
    pub threshold_bias: f32,
    /// Skew candidates are -skew_max_degrees..=skew_max_degrees
    pub skew_max_degrees: i32,
    pub skew_include_zero: bool,
    pub skew_sample_stride: usize,
    /// JPEG quality of the enhanced output (1-100)
    pub jpeg_quality: u8,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            max_long_edge: 1024,
            gamma: 0.8,
            window_divisor: 40,
            min_window: 10,
            threshold_bias: 8.0,
            skew_max_degrees: 5,
            skew_include_zero: false,
            skew_sample_stride: 4,
            jpeg_quality: 90,
        }
    }
}

impl PipelineParams {
    pub fn validate(&self) -> Result<(), EnhanceError> {
        if self.max_long_edge < steps::resize::MIN_SIDE {
            return Err(EnhanceError::Config(format!(
                "max_long_edge must be at least {}",
                steps::resize::MIN_SIDE
            )));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(EnhanceError::Config("gamma must be positive".to_string()));
        }
        if self.window_divisor == 0 {
            return Err(EnhanceError::Config(
                "window_divisor must be non-zero".to_string(),
            ));
        }
        if !self.threshold_bias.is_finite() {
            return Err(EnhanceError::Config(
                "threshold_bias must be finite".to_string(),
            ));
        }
        if self.skew_max_degrees < 0 || self.skew_max_degrees > 45 {
            return Err(EnhanceError::Config(
                "skew_max_degrees must be within 0..=45".to_string(),
            ));
        }
        if self.skew_max_degrees == 0 && !self.skew_include_zero {
            return Err(EnhanceError::Config(
                "skew search has no candidates; raise skew_max_degrees or include zero"
                    .to_string(),
            ));
        }
        if self.skew_sample_stride == 0 {
            return Err(EnhanceError::Config(
                "skew_sample_stride must be non-zero".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(EnhanceError::Config(
                "jpeg_quality must be within 1..=100".to_string(),
            ));
        }
        Ok(())
    }

    pub fn threshold(&self) -> ThresholdParams {
        ThresholdParams {
            window_divisor: self.window_divisor,
            min_window: self.min_window,
            bias: self.threshold_bias,
        }
    }

    pub fn skew_search(&self) -> SkewSearch {
        SkewSearch {
            max_degrees: self.skew_max_degrees,
            include_zero: self.skew_include_zero,
            sample_stride: self.skew_sample_stride,
        }
    }
}

/// Timing information for a single preprocessing step
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of preprocessing including timing stats
#[derive(Debug, Clone)]
pub struct PreprocessingResult {
    /// Enhanced, deskewed page
    pub image: RgbaImage,
    /// Estimated skew in degrees; the page was rotated by this amount
    pub skew_angle: i32,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Enhancement chain from tone normalization through deskew compositing
///
/// The input is expected to be already resized; it is only borrowed.
pub struct Pipeline {
    params: PipelineParams,
}

impl Pipeline {
    pub fn new(params: PipelineParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Process a page buffer through every enhancement stage
    pub fn process(&self, image: &RgbaImage) -> Result<PreprocessingResult, EnhanceError> {
        let start = Instant::now();
        let mut steps_timing = Vec::new();
        let (width, height) = image.dimensions();
        steps::resize::ensure_processable(width, height)?;

        let gamma = self.params.gamma;
        let threshold = self.params.threshold();

        let img = self.run_step("gamma", image, &mut steps_timing, |img| {
            Ok(steps::gamma::apply(img, gamma))
        })?;
        let img = self.run_step("denoise", &img, &mut steps_timing, |img| {
            Ok(steps::denoise::apply(img))
        })?;
        let img = self.run_step("equalize", &img, &mut steps_timing, |img| {
            Ok(steps::equalize::apply(img))
        })?;
        let img = self.run_step("sharpen", &img, &mut steps_timing, |img| {
            Ok(steps::sharpen::apply(img))
        })?;
        let img = self.run_step("threshold", &img, &mut steps_timing, |img| {
            Ok(steps::threshold::apply(img, &threshold))
        })?;
        let img = self.run_step("morphology", &img, &mut steps_timing, |img| {
            Ok(steps::morphology::apply(img))
        })?;

        let skew_start = Instant::now();
        let skew_angle = steps::deskew::estimate_skew_angle(&img, &self.params.skew_search());
        steps_timing.push(StepTiming {
            name: "skew_estimate".to_string(),
            time_ms: skew_start.elapsed().as_millis() as u64,
        });

        let img = self.run_step("composite", &img, &mut steps_timing, |img| {
            steps::deskew::rotate_onto_white(img, skew_angle)
        })?;

        tracing::debug!(
            "Enhanced {}x{} page, skew {} degrees",
            width,
            height,
            skew_angle
        );

        Ok(PreprocessingResult {
            image: img,
            skew_angle,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: steps_timing,
        })
    }

    fn run_step<F>(
        &self,
        name: &str,
        img: &RgbaImage,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<RgbaImage, EnhanceError>
    where
        F: FnOnce(&RgbaImage) -> Result<RgbaImage, EnhanceError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        Ok(result)
    }
}
