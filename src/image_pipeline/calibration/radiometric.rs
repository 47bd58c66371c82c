//! Exposure normalisation and band calibration into radiance or reflectance.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::Deserialize;
use tracing::debug;

use crate::image_pipeline::calibration::bands::BandCoefficients;
use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::metadata::FrameMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    Radiance,
    Reflectance,
}

impl CalibrationMode {
    /// Appended to the input stem to name the output file.
    pub fn suffix(self) -> &'static str {
        match self {
            CalibrationMode::Radiance => "_radiance",
            CalibrationMode::Reflectance => "_reflectance",
        }
    }

    pub fn needs_irradiance(self) -> bool {
        matches!(self, CalibrationMode::Reflectance)
    }
}

impl fmt::Display for CalibrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationMode::Radiance => f.write_str("radiance"),
            CalibrationMode::Reflectance => f.write_str("reflectance"),
        }
    }
}

impl FromStr for CalibrationMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "radiance" => Ok(CalibrationMode::Radiance),
            "reflectance" => Ok(CalibrationMode::Reflectance),
            other => Err(format!("unknown mode {:?}, expected radiance or reflectance", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiometricCalibrator {
    /// Smallest calibrated irradiance accepted as a reflectance divisor.
    pub min_calibrated_irradiance: f64,
}

impl Default for RadiometricCalibrator {
    fn default() -> Self {
        Self {
            min_calibrated_irradiance: 1e-6,
        }
    }
}

impl RadiometricCalibrator {
    pub fn new(min_calibrated_irradiance: f64) -> Self {
        Self {
            min_calibrated_irradiance,
        }
    }

    /// Converts a black-level-normalised image to radiance or reflectance.
    ///
    /// `corrected_irradiance` is only read in reflectance mode, where it is
    /// required.
    pub fn calibrate(
        &self,
        image: &Array2<f64>,
        metadata: &FrameMetadata,
        coefficients: &BandCoefficients,
        corrected_irradiance: Option<f64>,
        mode: CalibrationMode,
    ) -> Result<Array2<f64>> {
        if !(coefficients.sensitivity.abs() > 0.0) {
            return Err(CalibrationError::NumericError(
                "band sensitivity must be non-zero".to_string(),
            ));
        }

        let exposure_scale = metadata.sensor_gain * metadata.exposure_time / 1e2;
        let radiance = image.mapv(|v| {
            let signal = v / exposure_scale;
            (signal * coefficients.slope_cam + coefficients.intercept_cam) / coefficients.sensitivity
        });

        match mode {
            CalibrationMode::Radiance => Ok(radiance),
            CalibrationMode::Reflectance => {
                let corrected = corrected_irradiance.ok_or_else(|| {
                    CalibrationError::NumericError(
                        "reflectance requires a corrected irradiance".to_string(),
                    )
                })?;
                let calibrated = corrected * coefficients.slope_sun + coefficients.intercept_sun;
                debug!(
                    corrected_irradiance = corrected,
                    calibrated_irradiance = calibrated,
                    "Calibrated solar irradiance"
                );

                if !(calibrated >= self.min_calibrated_irradiance) {
                    return Err(CalibrationError::NumericError(format!(
                        "calibrated irradiance {} is below {}",
                        calibrated, self.min_calibrated_irradiance
                    )));
                }
                Ok(radiance.mapv_into(|v| v / calibrated))
            }
        }
    }
}
