//! Radiometric calibration module
//!
//! Band coefficients, black-level normalisation, the radiance/reflectance
//! conversion and the final 16-bit quantisation.

pub mod bands;
pub mod black_level;
pub mod quantize;
pub mod radiometric;

pub use bands::{BandCoefficients, BandId, BandTable};
pub use black_level::BlackLevel;
pub use quantize::quantize_unit_interval;
pub use radiometric::{CalibrationMode, RadiometricCalibrator};
