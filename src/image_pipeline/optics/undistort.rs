//! Lens undistortion, crop to the valid region, and resize to the canonical
//! output raster.
//!
//! The camera follows the pinhole + Brown-Conrady model (`k1, k2, p1, p2, k3`).
//! The new camera matrix is chosen the way OpenCV's
//! `getOptimalNewCameraMatrix` does: a 9×9 grid of border-spanning points is
//! undistorted, the inscribed and circumscribed rectangles are found, and
//! `alpha` blends between keeping only valid pixels (0) and keeping every
//! source pixel (1). The valid region of interest is the inscribed rectangle
//! projected through the new matrix.

use ndarray::{Array2, s};
use serde::Deserialize;
use tracing::debug;

use crate::image_pipeline::common::error::{CalibrationError, Result};

const RECT_GRID: usize = 9;
const UNDISTORT_ITERATIONS: usize = 5;

/// Pinhole camera intrinsics in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn is_valid(self) -> bool {
        [self.fx, self.fy, self.cx, self.cy].iter().all(|v| v.is_finite())
            && self.fx.abs() > 1e-12
            && self.fy.abs() > 1e-12
    }

    pub fn pixel_to_normalized(self, pixel: [f64; 2]) -> [f64; 2] {
        [(pixel[0] - self.cx) / self.fx, (pixel[1] - self.cy) / self.fy]
    }

    pub fn normalized_to_pixel(self, normalized: [f64; 2]) -> [f64; 2] {
        [self.fx * normalized[0] + self.cx, self.fy * normalized[1] + self.cy]
    }
}

/// Brown-Conrady coefficients in OpenCV order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct DistortionCoefficients {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl DistortionCoefficients {
    pub fn distort(self, normalized: [f64; 2]) -> [f64; 2] {
        let [x, y] = normalized;
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        [x * radial + dx, y * radial + dy]
    }

    /// Fixed-point inversion of [`distort`](Self::distort), five iterations
    /// as in `cv::undistortPoints`.
    pub fn undistort(self, distorted: [f64; 2]) -> [f64; 2] {
        let [x0, y0] = distorted;
        let (mut x, mut y) = (x0, y0);
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let inv_radial = 1.0 / (1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3)));
            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            x = (x0 - dx) * inv_radial;
            y = (y0 - dy) * inv_radial;
        }
        [x, y]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OutputSize {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraModel {
    pub intrinsics: CameraIntrinsics,
    pub distortion: DistortionCoefficients,
    /// Free scaling parameter of the new camera matrix, 0..=1.
    pub alpha: f64,
    /// Every undistorted frame is resampled to this size.
    pub output_size: OutputSize,
}

impl Default for CameraModel {
    fn default() -> Self {
        Self {
            intrinsics: CameraIntrinsics {
                fx: 1913.33333333,
                fy: 1913.33333333,
                cx: 800.0,
                cy: 650.0,
            },
            distortion: DistortionCoefficients {
                k1: -0.3942273061584405,
                k2: 0.2456273792422532,
                p1: 0.0,
                p2: 0.0,
                k3: -0.121852202339528,
            },
            alpha: 1.0,
            output_size: OutputSize {
                width: 1600,
                height: 1300,
            },
        }
    }
}

impl CameraModel {
    /// New camera matrix and valid-pixel rectangle for a `width`×`height` frame.
    pub fn optimal_new_camera_matrix(
        &self,
        width: usize,
        height: usize,
    ) -> Result<(CameraIntrinsics, PixelRect)> {
        if width < 2 || height < 2 {
            return Err(CalibrationError::InvalidDimensions(width, height));
        }
        let last_col = (width - 1) as f64;
        let last_row = (height - 1) as f64;
        let step = (RECT_GRID - 1) as f64;

        let (mut ix0, mut ix1, mut iy0, mut iy1) =
            (f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY);
        let (mut ox0, mut ox1, mut oy0, mut oy1) =
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);

        for gy in 0..RECT_GRID {
            for gx in 0..RECT_GRID {
                let pixel = [gx as f64 * last_col / step, gy as f64 * last_row / step];
                let [x, y] = self
                    .distortion
                    .undistort(self.intrinsics.pixel_to_normalized(pixel));

                ox0 = ox0.min(x);
                ox1 = ox1.max(x);
                oy0 = oy0.min(y);
                oy1 = oy1.max(y);

                if gx == 0 {
                    ix0 = ix0.max(x);
                }
                if gx == RECT_GRID - 1 {
                    ix1 = ix1.min(x);
                }
                if gy == 0 {
                    iy0 = iy0.max(y);
                }
                if gy == RECT_GRID - 1 {
                    iy1 = iy1.min(y);
                }
            }
        }

        let (inner_w, inner_h) = (ix1 - ix0, iy1 - iy0);
        let (outer_w, outer_h) = (ox1 - ox0, oy1 - oy0);
        if !(inner_w > 0.0 && inner_h > 0.0 && outer_w.is_finite() && outer_h.is_finite()) {
            return Err(CalibrationError::NumericError(
                "lens model folds the image; no inscribed rectangle".to_string(),
            ));
        }

        // Inner keeps only valid pixels, outer keeps every source pixel.
        let fx0 = last_col / inner_w;
        let fy0 = last_row / inner_h;
        let (cx0, cy0) = (-fx0 * ix0, -fy0 * iy0);
        let fx1 = last_col / outer_w;
        let fy1 = last_row / outer_h;
        let (cx1, cy1) = (-fx1 * ox0, -fy1 * oy0);

        let a = self.alpha;
        let new_intrinsics = CameraIntrinsics {
            fx: fx0 * (1.0 - a) + fx1 * a,
            fy: fy0 * (1.0 - a) + fy1 * a,
            cx: cx0 * (1.0 - a) + cx1 * a,
            cy: cy0 * (1.0 - a) + cy1 * a,
        };

        let [left, top] = new_intrinsics.normalized_to_pixel([ix0, iy0]);
        let (x, y) = (left.round(), top.round());
        let w = (inner_w * new_intrinsics.fx).round();
        let h = (inner_h * new_intrinsics.fy).round();

        let x0 = x.max(0.0);
        let y0 = y.max(0.0);
        let x1 = (x + w).min(width as f64);
        let y1 = (y + h).min(height as f64);
        if x1 <= x0 || y1 <= y0 {
            return Err(CalibrationError::NumericError(format!(
                "valid pixel region is empty for {}x{}",
                width, height
            )));
        }

        let roi = PixelRect {
            x: x0 as usize,
            y: y0 as usize,
            width: (x1 - x0) as usize,
            height: (y1 - y0) as usize,
        };
        Ok((new_intrinsics, roi))
    }

    /// Undistorts, crops to the valid region and resamples to `output_size`.
    pub fn undistort(&self, image: &Array2<f64>) -> Result<Array2<f64>> {
        let (rows, cols) = image.dim();
        let (new_intrinsics, roi) = self.optimal_new_camera_matrix(cols, rows)?;
        debug!(
            fx = new_intrinsics.fx,
            fy = new_intrinsics.fy,
            cx = new_intrinsics.cx,
            cy = new_intrinsics.cy,
            roi_x = roi.x,
            roi_y = roi.y,
            roi_width = roi.width,
            roi_height = roi.height,
            "Undistortion camera matrix"
        );

        let remapped = self.remap(image, &new_intrinsics);
        let cropped = crop(&remapped, roi);
        Ok(resize_bilinear(
            &cropped,
            self.output_size.width,
            self.output_size.height,
        ))
    }

    /// Pulls every destination pixel of the new camera back through the
    /// distortion model into the source frame.
    fn remap(&self, image: &Array2<f64>, new_intrinsics: &CameraIntrinsics) -> Array2<f64> {
        Array2::from_shape_fn(image.dim(), |(row, col)| {
            let normalized = new_intrinsics.pixel_to_normalized([col as f64, row as f64]);
            let [sx, sy] = self
                .intrinsics
                .normalized_to_pixel(self.distortion.distort(normalized));
            sample_bilinear(image, sx, sy)
        })
    }
}

/// Bilinear sample with a zero border.
fn sample_bilinear(image: &Array2<f64>, x: f64, y: f64) -> f64 {
    if !x.is_finite() || !y.is_finite() {
        return 0.0;
    }
    let (rows, cols) = image.dim();
    let (xf, yf) = (x.floor(), y.floor());
    let (wx, wy) = (x - xf, y - yf);
    let (x0, y0) = (xf as i64, yf as i64);

    let at = |r: i64, c: i64| -> f64 {
        if r >= 0 && c >= 0 && (r as usize) < rows && (c as usize) < cols {
            image[[r as usize, c as usize]]
        } else {
            0.0
        }
    };

    let top = at(y0, x0) * (1.0 - wx) + at(y0, x0 + 1) * wx;
    let bottom = at(y0 + 1, x0) * (1.0 - wx) + at(y0 + 1, x0 + 1) * wx;
    top * (1.0 - wy) + bottom * wy
}

/// Source taps `(i0, i1, weight of i1)` for each destination index, using
/// pixel-centre alignment and edge clamping.
fn linear_taps(src: usize, dst: usize) -> Vec<(usize, usize, f64)> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|d| {
            let pos = (d as f64 + 0.5) * scale - 0.5;
            let (index, weight) = if pos < 0.0 {
                (0, 0.0)
            } else {
                (pos.floor() as usize, pos - pos.floor())
            };
            if index + 1 >= src {
                (src - 1, src - 1, 0.0)
            } else {
                (index, index + 1, weight)
            }
        })
        .collect()
}

/// Bilinear resize to `width`×`height`.
pub fn resize_bilinear(image: &Array2<f64>, width: usize, height: usize) -> Array2<f64> {
    let (rows, cols) = image.dim();
    if rows == 0 || cols == 0 {
        return Array2::zeros((height, width));
    }
    let row_taps = linear_taps(rows, height);
    let col_taps = linear_taps(cols, width);

    Array2::from_shape_fn((height, width), |(r, c)| {
        let (y0, y1, wy) = row_taps[r];
        let (x0, x1, wx) = col_taps[c];
        let top = image[[y0, x0]] * (1.0 - wx) + image[[y0, x1]] * wx;
        let bottom = image[[y1, x0]] * (1.0 - wx) + image[[y1, x1]] * wx;
        top * (1.0 - wy) + bottom * wy
    })
}

/// Copies `rect` out of `image`.
pub fn crop(image: &Array2<f64>, rect: PixelRect) -> Array2<f64> {
    image
        .slice(s![rect.y..rect.y + rect.height, rect.x..rect.x + rect.width])
        .to_owned()
}
