//! Individual preprocessing steps

pub mod denoise;
pub mod deskew;
pub mod equalize;
pub mod gamma;
pub mod luminance;
pub mod morphology;
pub mod resize;
pub mod sharpen;
pub mod threshold;
