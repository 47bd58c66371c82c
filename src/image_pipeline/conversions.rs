//! Pipeline conversions module
//!
//! This module contains the per-frame orchestration of the calibration stages.

mod calibration_pipeline;
mod outcome;


pub use calibration_pipeline::{CalibrationPipeline, PipelineStage};
pub use outcome::{Conversion, FrameOutcome};
