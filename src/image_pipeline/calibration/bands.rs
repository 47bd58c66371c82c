//! Spectral band identification and per-band calibration constants.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::image_pipeline::common::error::{CalibrationError, Result};

/// Band number 1..=5, taken from the last digit of the file stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BandId(u8);

impl BandId {
    /// The blue band, which has no usable coefficients and is never processed.
    pub const BLUE: BandId = BandId(1);

    pub fn new(id: u8) -> Result<Self> {
        match id {
            1..=5 => Ok(BandId(id)),
            other => Err(CalibrationError::UnknownBandError(format!(
                "band {} is outside 1..=5",
                other
            ))),
        }
    }

    /// `DJI_0013.TIF` is band 3.
    pub fn from_path(path: &Path) -> Result<Self> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                CalibrationError::UnknownBandError(format!("no file name in {}", path.display()))
            })?;

        let digit = stem
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(|| {
                CalibrationError::UnknownBandError(format!(
                    "{} does not end in a band digit",
                    path.display()
                ))
            })?;

        BandId::new(digit as u8).map_err(|_| {
            CalibrationError::UnknownBandError(format!(
                "{} has unrecognised band suffix {}",
                path.display(),
                digit
            ))
        })
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_skipped(self) -> bool {
        self == Self::BLUE
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BandCoefficients {
    pub slope_cam: f64,
    pub intercept_cam: f64,
    pub slope_sun: f64,
    pub intercept_sun: f64,
    pub sensitivity: f64,
}

/// Coefficients keyed by band number. Band 1 never has an entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct BandTable(BTreeMap<u8, BandCoefficients>);

impl Default for BandTable {
    fn default() -> Self {
        let entry = |slope_cam, slope_sun, intercept_sun, sensitivity| BandCoefficients {
            slope_cam,
            intercept_cam: 0.0,
            slope_sun,
            intercept_sun,
            sensitivity,
        };
        BandTable(BTreeMap::from([
            (2, entry(35.27, 4.64e-3, 2.83, 0.705)),
            (3, entry(33.06, 4.74e-3, 1.95, 0.709)),
            (4, entry(29.05, 4.44e-3, 0.99, 0.589)),
            (5, entry(26.74, 5.50e-3, 0.94, 0.396)),
        ]))
    }
}

impl BandTable {
    pub fn lookup(&self, band: BandId) -> Result<&BandCoefficients> {
        self.0.get(&band.get()).ok_or_else(|| {
            CalibrationError::UnknownBandError(format!("no calibration coefficients for band {}", band))
        })
    }

    pub fn insert(&mut self, band: BandId, coefficients: BandCoefficients) {
        self.0.insert(band.get(), coefficients);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u8, &BandCoefficients)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_from_file_stem() {
        assert_eq!(BandId::from_path(Path::new("/data/DJI_0013.TIF")).unwrap().get(), 3);
        assert_eq!(BandId::from_path(Path::new("DJI_0025.tif")).unwrap().get(), 5);
        assert!(BandId::from_path(Path::new("DJI_0011.TIF")).unwrap().is_skipped());
    }

    #[test]
    fn test_unknown_band_suffixes() {
        for name in ["DJI_0010.TIF", "DJI_0017.TIF", "DJI_001X.TIF", "notes"] {
            assert!(
                matches!(
                    BandId::from_path(Path::new(name)),
                    Err(CalibrationError::UnknownBandError(_))
                ),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_default_table_has_no_blue_entry() {
        let table = BandTable::default();
        assert!(table.lookup(BandId::BLUE).is_err());
        assert_eq!(table.lookup(BandId::new(4).unwrap()).unwrap().sensitivity, 0.589);
        assert_eq!(table.iter().count(), 4);
    }

    #[test]
    fn test_table_deserializes_from_string_keys() {
        let json = r#"{"2": {"slope_cam": 1.0, "intercept_cam": 0.5, "slope_sun": 0.01,
                             "intercept_sun": 2.0, "sensitivity": 0.9}}"#;
        let table: BandTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.lookup(BandId::new(2).unwrap()).unwrap().intercept_cam, 0.5);
        assert!(table.lookup(BandId::new(3).unwrap()).is_err());
    }
}
