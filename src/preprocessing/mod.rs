//! Document-image enhancement pipeline
//!
//! Every stage is a pure function from one RGBA buffer to a fresh buffer of the
//! same dimensions; the pipeline threads buffers from stage to stage.

pub mod pipeline;
pub mod steps;

pub use pipeline::{Pipeline, PipelineParams, StepTiming};
