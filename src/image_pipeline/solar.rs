//! Solar geometry module
//!
//! Sun position lookup and the tilt correction applied to the onboard
//! irradiance sensor reading.

pub mod ephemeris;
pub mod geometry;

pub use ephemeris::{FixedSunPosition, NoaaEphemeris, SolarEphemeris, SolarPosition};
pub use geometry::{
    IrradianceCorrection, angle_between_vectors, body_normal, compute_corrected_irradiance,
    correct_irradiance, sun_vector,
};
