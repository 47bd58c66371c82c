//! Calibration configuration
//!
//! Every camera-specific constant lives here so a recalibrated unit only
//! needs a new JSON file. Missing fields fall back to the P4M reference
//! values.

use std::path::Path;
use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;

use crate::image_pipeline::calibration::{BandTable, BlackLevel};
use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::optics::{CameraModel, VignetteModel};
use crate::image_pipeline::tiff::EncodingConfig;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub black_level: BlackLevel,
    pub vignette: VignetteModel,
    pub camera: CameraModel,
    pub bands: BandTable,
    /// Frames whose body-sun angle exceeds this (degrees) are rejected.
    pub max_body_sun_angle: f64,
    pub min_calibrated_irradiance: f64,
    /// Offset of the capture timestamps from UTC, in minutes.
    pub utc_offset_minutes: i32,
    pub metadata_timeout_secs: u64,
    pub encoding: EncodingConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            black_level: BlackLevel::default(),
            vignette: VignetteModel::default(),
            camera: CameraModel::default(),
            bands: BandTable::default(),
            max_body_sun_angle: 89.0,
            min_calibrated_irradiance: 1e-6,
            utc_offset_minutes: 9 * 60,
            metadata_timeout_secs: 30,
            encoding: EncodingConfig::default(),
        }
    }
}

impl CalibrationConfig {
    pub fn builder() -> CalibrationConfigBuilder {
        CalibrationConfigBuilder::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CalibrationError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CalibrationError::ConfigError(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(CalibrationError::ConfigError(msg));

        if !(self.black_level.level >= 0.0 && self.black_level.level < self.black_level.max_value) {
            return invalid(format!(
                "black level {} must be below max value {}",
                self.black_level.level, self.black_level.max_value
            ));
        }
        if !self.camera.intrinsics.is_valid() {
            return invalid(format!("camera intrinsics {:?} are degenerate", self.camera.intrinsics));
        }
        if !(0.0..=1.0).contains(&self.camera.alpha) {
            return invalid(format!("alpha {} must be within 0..=1", self.camera.alpha));
        }
        if self.camera.output_size.width == 0 || self.camera.output_size.height == 0 {
            return invalid("output size must be non-empty".to_string());
        }
        if !(self.max_body_sun_angle > 0.0 && self.max_body_sun_angle < 90.0) {
            return invalid(format!(
                "max body-sun angle {} must be within (0, 90)",
                self.max_body_sun_angle
            ));
        }
        if !(self.min_calibrated_irradiance > 0.0) {
            return invalid(format!(
                "minimum calibrated irradiance {} must be positive",
                self.min_calibrated_irradiance
            ));
        }
        if self.metadata_timeout_secs == 0 {
            return invalid("metadata timeout must be at least one second".to_string());
        }
        if let Some((band, _)) = self.bands.iter().find(|(_, c)| c.sensitivity == 0.0) {
            return invalid(format!("band {} has zero sensitivity", band));
        }
        self.utc_offset()?;
        Ok(())
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            CalibrationError::ConfigError(format!(
                "UTC offset of {} minutes is out of range",
                self.utc_offset_minutes
            ))
        })
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }
}

/// Builder for CalibrationConfig
#[derive(Default)]
pub struct CalibrationConfigBuilder {
    black_level: Option<BlackLevel>,
    vignette: Option<VignetteModel>,
    camera: Option<CameraModel>,
    bands: Option<BandTable>,
    max_body_sun_angle: Option<f64>,
    min_calibrated_irradiance: Option<f64>,
    utc_offset_minutes: Option<i32>,
    metadata_timeout_secs: Option<u64>,
    encoding: Option<EncodingConfig>,
}

impl CalibrationConfigBuilder {
    pub fn black_level(mut self, black_level: BlackLevel) -> Self {
        self.black_level = Some(black_level);
        self
    }

    pub fn vignette(mut self, vignette: VignetteModel) -> Self {
        self.vignette = Some(vignette);
        self
    }

    pub fn camera(mut self, camera: CameraModel) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn bands(mut self, bands: BandTable) -> Self {
        self.bands = Some(bands);
        self
    }

    pub fn max_body_sun_angle(mut self, degrees: f64) -> Self {
        self.max_body_sun_angle = Some(degrees);
        self
    }

    pub fn min_calibrated_irradiance(mut self, minimum: f64) -> Self {
        self.min_calibrated_irradiance = Some(minimum);
        self
    }

    pub fn utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = Some(minutes);
        self
    }

    pub fn metadata_timeout_secs(mut self, secs: u64) -> Self {
        self.metadata_timeout_secs = Some(secs);
        self
    }

    pub fn encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn build(self) -> CalibrationConfig {
        let default = CalibrationConfig::default();
        CalibrationConfig {
            black_level: self.black_level.unwrap_or(default.black_level),
            vignette: self.vignette.unwrap_or(default.vignette),
            camera: self.camera.unwrap_or(default.camera),
            bands: self.bands.unwrap_or(default.bands),
            max_body_sun_angle: self.max_body_sun_angle.unwrap_or(default.max_body_sun_angle),
            min_calibrated_irradiance: self
                .min_calibrated_irradiance
                .unwrap_or(default.min_calibrated_irradiance),
            utc_offset_minutes: self.utc_offset_minutes.unwrap_or(default.utc_offset_minutes),
            metadata_timeout_secs: self
                .metadata_timeout_secs
                .unwrap_or(default.metadata_timeout_secs),
            encoding: self.encoding.unwrap_or(default.encoding),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::tiff::TiffCompression;

    #[test]
    fn test_config_builder() {
        let config = CalibrationConfig::builder()
            .max_body_sun_angle(80.0)
            .utc_offset_minutes(0)
            .encoding(EncodingConfig::builder().compression(TiffCompression::Lzw).build())
            .build();

        assert_eq!(config.max_body_sun_angle, 80.0);
        assert_eq!(config.utc_offset().unwrap().local_minus_utc(), 0);
        assert_eq!(config.encoding.compression, TiffCompression::Lzw);
        assert_eq!(config.black_level, BlackLevel::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_is_valid() {
        let config = CalibrationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.utc_offset().unwrap().local_minus_utc(), 9 * 3600);
        assert_eq!(config.camera.output_size.width, 1600);
        assert_eq!(config.camera.output_size.height, 1300);
    }

    #[test]
    fn test_partial_json_overrides_defaults() {
        let json = r#"{
            "black_level": {"level": 3000.0},
            "vignette": {"pixel_scale": 0.004},
            "camera": {"intrinsics": {"fx": 1900.0, "fy": 1900.0, "cx": 800.0, "cy": 650.0}},
            "encoding": {"compression": "deflate_best"}
        }"#;
        let config = CalibrationConfig::from_json_str(json).unwrap();

        assert_eq!(config.black_level.level, 3000.0);
        assert_eq!(config.black_level.max_value, 65535.0);
        assert_eq!(config.vignette.pixel_scale, 0.004);
        assert_eq!(config.vignette.coefficients, VignetteModel::default().coefficients);
        assert_eq!(config.camera.intrinsics.fx, 1900.0);
        assert_eq!(config.camera.distortion, CameraModel::default().distortion);
        assert_eq!(config.encoding.compression, TiffCompression::DeflateBest);
        assert_eq!(config.bands, BandTable::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_black = r#"{"black_level": {"level": 70000.0}}"#;
        assert!(matches!(
            CalibrationConfig::from_json_str(bad_black),
            Err(CalibrationError::ConfigError(_))
        ));

        let bad_angle = CalibrationConfig::builder().max_body_sun_angle(90.0).build();
        assert!(bad_angle.validate().is_err());

        assert!(CalibrationConfig::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = CalibrationConfig::from_json_file("/nonexistent/calibration.json");
        assert!(matches!(result, Err(CalibrationError::ConfigError(_))));
    }
}
