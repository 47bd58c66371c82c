//! Common utilities module
//!
//! This module contains shared utilities used across the calibration pipeline.

pub mod error;
pub mod timing;

pub use error::{CalibrationError, ErrorKind, Result};
pub use timing::{PipelineTimings, StepTiming, Timer};
