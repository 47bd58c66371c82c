//! Solar position providers.
//!
//! [`NoaaEphemeris`] implements the NOAA general solar position equations
//! (Julian century, equation of time, declination, hour angle) with the
//! standard atmospheric refraction term, so altitudes are apparent altitudes.
//! Accuracy is well under 0.1° for dates between 1901 and 2099, which is far
//! below what the irradiance correction can resolve.

use chrono::{DateTime, FixedOffset, Timelike, Utc};

use crate::image_pipeline::common::error::{CalibrationError, Result};

/// Apparent sun position in degrees. Azimuth is clockwise from true north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    pub altitude: f64,
    pub azimuth: f64,
}

pub trait SolarEphemeris {
    fn position(
        &self,
        latitude: f64,
        longitude: f64,
        local_time: &DateTime<FixedOffset>,
    ) -> Result<SolarPosition>;
}

/// Returns the same position for every query.
#[derive(Debug, Clone, Copy)]
pub struct FixedSunPosition(pub SolarPosition);

impl SolarEphemeris for FixedSunPosition {
    fn position(&self, _: f64, _: f64, _: &DateTime<FixedOffset>) -> Result<SolarPosition> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoaaEphemeris;

const JULIAN_UNIX_EPOCH: f64 = 2_440_587.5;
const J2000: f64 = 2_451_545.0;
const DAYS_PER_CENTURY: f64 = 36_525.0;
const MINUTES_PER_DAY: f64 = 1_440.0;

impl SolarEphemeris for NoaaEphemeris {
    fn position(
        &self,
        latitude: f64,
        longitude: f64,
        local_time: &DateTime<FixedOffset>,
    ) -> Result<SolarPosition> {
        if !latitude.is_finite() || latitude.abs() > 90.0 {
            return Err(CalibrationError::EphemerisError(format!("latitude {} out of range", latitude)));
        }
        if !longitude.is_finite() || longitude.abs() > 180.0 {
            return Err(CalibrationError::EphemerisError(format!("longitude {} out of range", longitude)));
        }

        let utc = local_time.with_timezone(&Utc);
        let julian_day = utc.timestamp() as f64 / 86_400.0
            + f64::from(utc.timestamp_subsec_nanos()) / 86_400e9
            + JULIAN_UNIX_EPOCH;
        let t = (julian_day - J2000) / DAYS_PER_CENTURY;

        let mean_longitude = (280.46646 + t * (36000.76983 + t * 0.0003032)).rem_euclid(360.0);
        let mean_anomaly = 357.52911 + t * (35999.05029 - 0.0001537 * t);
        let eccentricity = 0.016708634 - t * (0.000042037 + 0.0000001267 * t);

        let m = mean_anomaly.to_radians();
        let center = m.sin() * (1.914602 - t * (0.004817 + 0.000014 * t))
            + (2.0 * m).sin() * (0.019993 - 0.000101 * t)
            + (3.0 * m).sin() * 0.000289;
        let true_longitude = mean_longitude + center;

        let omega = (125.04 - 1934.136 * t).to_radians();
        let apparent_longitude = true_longitude - 0.00569 - 0.00478 * omega.sin();

        let mean_obliquity =
            23.0 + (26.0 + (21.448 - t * (46.815 + t * (0.00059 - t * 0.001813))) / 60.0) / 60.0;
        let obliquity = (mean_obliquity + 0.00256 * omega.cos()).to_radians();

        let declination = (obliquity.sin() * apparent_longitude.to_radians().sin()).asin();

        let y = (obliquity / 2.0).tan().powi(2);
        let l0 = mean_longitude.to_radians();
        let equation_of_time = 4.0
            * (y * (2.0 * l0).sin() - 2.0 * eccentricity * m.sin()
                + 4.0 * eccentricity * y * m.sin() * (2.0 * l0).cos()
                - 0.5 * y * y * (4.0 * l0).sin()
                - 1.25 * eccentricity * eccentricity * (2.0 * m).sin())
            .to_degrees();

        let minutes_of_day = f64::from(utc.num_seconds_from_midnight()) / 60.0
            + f64::from(utc.nanosecond()) / 60e9;
        let true_solar_time =
            (minutes_of_day + equation_of_time + 4.0 * longitude).rem_euclid(MINUTES_PER_DAY);
        let hour_angle = true_solar_time / 4.0 - 180.0;

        let lat = latitude.to_radians();
        let ha = hour_angle.to_radians();
        let cos_zenith = (lat.sin() * declination.sin() + lat.cos() * declination.cos() * ha.cos())
            .clamp(-1.0, 1.0);
        let zenith = cos_zenith.acos();
        let elevation = 90.0 - zenith.to_degrees();

        // Azimuth is undefined with the sun at the zenith or an observer at a pole.
        let denominator = lat.cos() * zenith.sin();
        let azimuth_cos = if denominator.abs() < 1e-12 {
            1.0
        } else {
            ((lat.sin() * cos_zenith) - declination.sin()) / denominator
        };
        let azimuth_from_south = azimuth_cos.clamp(-1.0, 1.0).acos().to_degrees();
        let azimuth = if hour_angle > 0.0 {
            (azimuth_from_south + 180.0).rem_euclid(360.0)
        } else {
            (540.0 - azimuth_from_south).rem_euclid(360.0)
        };

        let altitude = elevation + refraction_correction(elevation);

        if !altitude.is_finite() || !azimuth.is_finite() {
            return Err(CalibrationError::EphemerisError(format!(
                "undefined sun position at lat={} lon={} time={}",
                latitude, longitude, local_time
            )));
        }

        Ok(SolarPosition { altitude, azimuth })
    }
}

/// Approximate atmospheric refraction in degrees for a geometric elevation.
fn refraction_correction(elevation: f64) -> f64 {
    let arcseconds = if elevation > 85.0 {
        0.0
    } else if elevation > 5.0 {
        let te = elevation.to_radians().tan();
        58.1 / te - 0.07 / te.powi(3) + 0.000086 / te.powi(5)
    } else if elevation > -0.575 {
        1735.0 + elevation * (-518.2 + elevation * (103.4 + elevation * (-12.79 + elevation * 0.711)))
    } else {
        -20.772 / elevation.to_radians().tan()
    };
    arcseconds / 3600.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(offset_hours: i32, y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
    }

    #[test]
    fn test_tokyo_summer_noon_is_high_and_south() {
        // Solar noon in Tokyo is around 11:40 JST in June.
        let pos = NoaaEphemeris
            .position(35.68, 139.69, &at(9, 2023, 6, 21, 11, 40))
            .unwrap();
        assert!((pos.altitude - 77.8).abs() < 1.0, "altitude {}", pos.altitude);
        assert!(pos.azimuth > 150.0 && pos.azimuth < 210.0, "azimuth {}", pos.azimuth);
    }

    #[test]
    fn test_morning_sun_in_the_east() {
        let pos = NoaaEphemeris
            .position(35.68, 139.69, &at(9, 2023, 3, 21, 8, 0))
            .unwrap();
        assert!(pos.altitude > 0.0 && pos.altitude < 45.0, "altitude {}", pos.altitude);
        assert!(pos.azimuth > 60.0 && pos.azimuth < 135.0, "azimuth {}", pos.azimuth);
    }

    #[test]
    fn test_midnight_sun_below_horizon() {
        let pos = NoaaEphemeris
            .position(35.68, 139.69, &at(9, 2023, 6, 21, 0, 0))
            .unwrap();
        assert!(pos.altitude < -20.0);
    }

    #[test]
    fn test_offset_only_changes_representation() {
        let tokyo = NoaaEphemeris.position(35.0, 139.0, &at(9, 2024, 1, 10, 12, 0)).unwrap();
        let utc = NoaaEphemeris.position(35.0, 139.0, &at(0, 2024, 1, 10, 3, 0)).unwrap();
        assert!((tokyo.altitude - utc.altitude).abs() < 1e-9);
        assert!((tokyo.azimuth - utc.azimuth).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        let when = at(9, 2023, 6, 21, 12, 0);
        assert!(matches!(
            NoaaEphemeris.position(91.0, 0.0, &when),
            Err(CalibrationError::EphemerisError(_))
        ));
        assert!(matches!(
            NoaaEphemeris.position(0.0, f64::NAN, &when),
            Err(CalibrationError::EphemerisError(_))
        ));
    }

    #[test]
    fn test_refraction_lifts_low_sun() {
        assert!(refraction_correction(0.0) > 0.4);
        assert_eq!(refraction_correction(89.0), 0.0);
    }
}
