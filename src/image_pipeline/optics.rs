//! Optical corrections: radial vignette falloff and lens undistortion.

pub mod undistort;
pub mod vignette;

pub use undistort::{
    CameraIntrinsics, CameraModel, DistortionCoefficients, OutputSize, PixelRect, crop,
    resize_bilinear,
};
pub use vignette::VignetteModel;
