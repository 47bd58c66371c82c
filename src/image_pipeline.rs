//! Multispectral calibration pipeline module
//!
//! This module turns single-band sensor frames into radiometrically calibrated,
//! undistorted 16-bit TIFFs, with separate modules for frame reading, metadata,
//! solar geometry, optics, TIFF writing and per-frame orchestration.

pub mod calibration;
pub mod common;
pub mod config;
pub mod conversions;
pub mod metadata;
pub mod optics;
pub mod raw;
pub mod solar;
pub mod tiff;

pub use common::{CalibrationError, ErrorKind, Result};

pub use raw::{FrameReader, RawFrame, TiffFrameReader};

pub use tiff::{EncodingConfig, StandardTiffWriter, TiffCompression, TiffWriter};

pub use metadata::{ExiftoolSource, FrameMetadata, InMemoryTags, MetadataSource};

pub use solar::{FixedSunPosition, NoaaEphemeris, SolarEphemeris, SolarPosition};

pub use calibration::{BandId, CalibrationMode};

pub use config::{CalibrationConfig, CalibrationConfigBuilder};

pub use conversions::{CalibrationPipeline, Conversion, FrameOutcome, PipelineStage};
