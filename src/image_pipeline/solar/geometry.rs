//! Body-normal / sun-vector geometry for the irradiance tilt correction.
//!
//! The sunlight sensor sits on top of the aircraft, so its reading depends on
//! the angle between the body normal and the sun. The correction rescales the
//! reading to what a level sensor would have measured:
//!
//! ```text
//! E_corrected = E_raw * cos(angle_horizontal_sun) / cos(angle_body_sun)
//! ```

use nalgebra::{Matrix3, Vector3};
use tracing::debug;

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::metadata::{Attitude, FrameMetadata};
use crate::image_pipeline::solar::ephemeris::{SolarEphemeris, SolarPosition};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IrradianceCorrection {
    pub sun: SolarPosition,
    pub angle_body_sun: f64,
    pub angle_horizontal_sun: f64,
    pub corrected_irradiance: f64,
}

/// Rotates `(0, 0, 1)` as `R_yaw · R_roll · R_pitch · n0`.
pub fn body_normal(attitude: &Attitude) -> Vector3<f64> {
    let pitch = attitude.pitch.to_radians();
    let roll = attitude.roll.to_radians();
    let yaw = attitude.yaw.to_radians();

    #[rustfmt::skip]
    let r_pitch = Matrix3::new(
        1.0, 0.0,          0.0,
        0.0, pitch.cos(), -pitch.sin(),
        0.0, pitch.sin(),  pitch.cos(),
    );
    #[rustfmt::skip]
    let r_roll = Matrix3::new(
         roll.cos(), 0.0, roll.sin(),
         0.0,        1.0, 0.0,
        -roll.sin(), 0.0, roll.cos(),
    );
    #[rustfmt::skip]
    let r_yaw = Matrix3::new(
        yaw.cos(), -yaw.sin(), 0.0,
        yaw.sin(),  yaw.cos(), 0.0,
        0.0,        0.0,       1.0,
    );

    r_yaw * r_roll * r_pitch * Vector3::z()
}

/// Unit vector toward the sun; x east, y north, z up.
pub fn sun_vector(sun: &SolarPosition) -> Vector3<f64> {
    let altitude = sun.altitude.to_radians();
    let azimuth = sun.azimuth.to_radians();
    Vector3::new(
        altitude.cos() * azimuth.sin(),
        altitude.cos() * azimuth.cos(),
        altitude.sin(),
    )
}

/// Angle in degrees. Undefined (NaN) when either vector is zero.
pub fn angle_between_vectors(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let cos_theta = a.dot(b) / (a.norm() * b.norm());
    cos_theta.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Applies the tilt correction for a known sun position.
///
/// Fails with [`CalibrationError::NumericError`] when the body-sun angle
/// exceeds `max_body_sun_angle`, where the cosine denominator collapses.
pub fn correct_irradiance(
    attitude: &Attitude,
    raw_irradiance: f64,
    sun: SolarPosition,
    max_body_sun_angle: f64,
) -> Result<IrradianceCorrection> {
    let normal = body_normal(attitude);
    let sun_dir = sun_vector(&sun);

    let angle_body_sun = angle_between_vectors(&normal, &sun_dir);
    let angle_horizontal_sun = angle_between_vectors(&Vector3::z(), &sun_dir);

    if !(angle_body_sun <= max_body_sun_angle) {
        return Err(CalibrationError::NumericError(format!(
            "body-sun angle {:.3}° exceeds limit {:.3}°",
            angle_body_sun, max_body_sun_angle
        )));
    }

    let corrected_irradiance = raw_irradiance * angle_horizontal_sun.to_radians().cos()
        / angle_body_sun.to_radians().cos();

    Ok(IrradianceCorrection {
        sun,
        angle_body_sun,
        angle_horizontal_sun,
        corrected_irradiance,
    })
}

/// Looks up the sun for this frame and corrects its irradiance reading.
pub fn compute_corrected_irradiance<E: SolarEphemeris + ?Sized>(
    ephemeris: &E,
    metadata: &FrameMetadata,
    max_body_sun_angle: f64,
) -> Result<IrradianceCorrection> {
    let sun = ephemeris.position(
        metadata.position.latitude,
        metadata.position.longitude,
        &metadata.captured_at,
    )?;
    let correction = correct_irradiance(&metadata.attitude, metadata.irradiance, sun, max_body_sun_angle)?;

    debug!(
        altitude = sun.altitude,
        azimuth = sun.azimuth,
        angle_body_sun = correction.angle_body_sun,
        angle_horizontal_sun = correction.angle_horizontal_sun,
        corrected_irradiance = correction.corrected_irradiance,
        "Irradiance corrected"
    );
    Ok(correction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn level() -> Attitude {
        Attitude { pitch: 0.0, roll: 0.0, yaw: 0.0 }
    }

    #[test]
    fn test_angle_with_self_and_opposite() {
        for v in [Vector3::new(1.0, 2.0, 3.0), Vector3::new(-0.5, 0.0, 7.0), Vector3::x()] {
            assert_abs_diff_eq!(angle_between_vectors(&v, &v), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(angle_between_vectors(&v, &-v), 180.0, epsilon = 1e-5);
        }
        assert_abs_diff_eq!(angle_between_vectors(&Vector3::x(), &Vector3::y()), 90.0, epsilon = 1e-12);
    }

    #[test]
    fn test_level_body_normal_points_up() {
        let n = body_normal(&level());
        assert_abs_diff_eq!(n, Vector3::z(), epsilon = 1e-15);
    }

    #[test]
    fn test_yaw_alone_keeps_normal_vertical() {
        let n = body_normal(&Attitude { pitch: 0.0, roll: 0.0, yaw: 137.0 });
        assert_abs_diff_eq!(n, Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_pitch_then_roll_order() {
        // Pitch tilts about x: (0, -sin p, cos p).
        let n = body_normal(&Attitude { pitch: 30.0, roll: 0.0, yaw: 0.0 });
        assert_abs_diff_eq!(n, Vector3::new(0.0, -0.5, 3f64.sqrt() / 2.0), epsilon = 1e-12);

        // Roll tilts about y: (sin r, 0, cos r).
        let n = body_normal(&Attitude { pitch: 0.0, roll: 30.0, yaw: 0.0 });
        assert_abs_diff_eq!(n, Vector3::new(0.5, 0.0, 3f64.sqrt() / 2.0), epsilon = 1e-12);

        // Yaw of 90° turns the rolled normal from +x to +y.
        let n = body_normal(&Attitude { pitch: 0.0, roll: 30.0, yaw: 90.0 });
        assert_abs_diff_eq!(n, Vector3::new(0.0, 0.5, 3f64.sqrt() / 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_sun_vector_components() {
        let s = sun_vector(&SolarPosition { altitude: 90.0, azimuth: 0.0 });
        assert_abs_diff_eq!(s, Vector3::z(), epsilon = 1e-12);

        let s = sun_vector(&SolarPosition { altitude: 0.0, azimuth: 90.0 });
        assert_abs_diff_eq!(s, Vector3::x(), epsilon = 1e-12);
        assert_relative_eq!(s.norm(), 1.0);
    }

    #[test]
    fn test_level_aircraft_leaves_irradiance_unchanged() {
        let sun = SolarPosition { altitude: 45.0, azimuth: 180.0 };
        let c = correct_irradiance(&level(), 1000.0, sun, 89.0).unwrap();
        assert_relative_eq!(c.angle_body_sun, 45.0, epsilon = 1e-9);
        assert_relative_eq!(c.angle_horizontal_sun, 45.0, epsilon = 1e-9);
        assert_relative_eq!(c.corrected_irradiance, 1000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tilt_toward_sun_lowers_correction() {
        // Sun due east at 45°; rolling toward +x faces the sensor at the sun.
        let sun = SolarPosition { altitude: 45.0, azimuth: 90.0 };
        let tilted = Attitude { pitch: 0.0, roll: 45.0, yaw: 0.0 };
        let c = correct_irradiance(&tilted, 1000.0, sun, 89.0).unwrap();
        assert_abs_diff_eq!(c.angle_body_sun, 0.0, epsilon = 1e-5);
        assert_relative_eq!(c.corrected_irradiance, 1000.0 * 45f64.to_radians().cos(), epsilon = 1e-6);
    }

    #[test]
    fn test_grazing_body_sun_angle_rejected() {
        let sun = SolarPosition { altitude: 5.0, azimuth: 90.0 };
        let away = Attitude { pitch: 0.0, roll: -10.0, yaw: 0.0 };
        let result = correct_irradiance(&away, 1000.0, sun, 89.0);
        assert!(matches!(result, Err(CalibrationError::NumericError(_))));
    }
}
