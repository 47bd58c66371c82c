//! Radial vignette compensation.
//!
//! The gain at a pixel is a polynomial in its distance from the raster centre
//! (converted to physical units by `pixel_scale`), evaluated highest power
//! first with an implicit constant term of 1:
//!
//! ```text
//! V(x) = k0·x⁶ + k1·x⁵ + k2·x⁴ + k3·x³ + k4·x² + k5·x + 1,   x = r · pixel_scale
//! ```

use ndarray::{Array2, Zip};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VignetteModel {
    pub coefficients: [f64; 6],
    /// Physical size of one pixel (4.8 cm sensor / 1600 px on the P4M).
    pub pixel_scale: f64,
}

impl Default for VignetteModel {
    fn default() -> Self {
        Self {
            coefficients: [
                0.0018787752725863,
                -0.0171544589747222,
                0.063879037499455,
                -0.1062075650846842,
                0.1341353369677361,
                0.0727451182520206,
            ],
            pixel_scale: 0.003,
        }
    }
}

impl VignetteModel {
    /// Gain for a pixel `radius` pixels from the centre.
    pub fn factor(&self, radius: f64) -> f64 {
        let x = radius * self.pixel_scale;
        self.coefficients.iter().fold(0.0, |acc, &k| acc * x + k) * x + 1.0
    }

    /// Multiplies every pixel by its radial gain.
    ///
    /// The centre is `(rows / 2, cols / 2)` and distances are measured in
    /// `(row, col)` index space, matching the undistortion stage's grid.
    pub fn correct(&self, image: &Array2<f64>) -> Array2<f64> {
        let (rows, cols) = image.dim();
        let center_row = rows as f64 / 2.0;
        let center_col = cols as f64 / 2.0;

        Zip::indexed(image).map_collect(|(row, col), &value| {
            let r = (row as f64 - center_row).hypot(col as f64 - center_col);
            value * self.factor(r)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_gain_at_center() {
        let model = VignetteModel::default();
        assert_eq!(model.factor(0.0), 1.0);

        let image = Array2::from_elem((4, 6), 0.5);
        let corrected = model.correct(&image);
        assert_eq!(corrected[[2, 3]], 0.5);
    }

    #[test]
    fn test_factor_matches_expanded_polynomial() {
        let model = VignetteModel::default();
        let k = model.coefficients;
        let x: f64 = 800.0 * 0.003;
        let expected = k[0] * x.powi(6) + k[1] * x.powi(5) + k[2] * x.powi(4) + k[3] * x.powi(3)
            + k[4] * x.powi(2) + k[5] * x + 1.0;
        assert_relative_eq!(model.factor(800.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_gain_grows_toward_corners() {
        let model = VignetteModel::default();
        let image = Array2::from_elem((1300, 1600), 1.0);
        let corrected = model.correct(&image);

        assert!(corrected[[0, 0]] > corrected[[650, 400]]);
        assert!(corrected[[650, 400]] > corrected[[650, 800]]);
    }

    #[test]
    fn test_radius_uses_rows_then_cols() {
        // A single non-zero coefficient makes the gain linear in radius.
        let model = VignetteModel {
            coefficients: [0.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            pixel_scale: 1.0,
        };
        let image = Array2::from_elem((4, 10), 1.0);
        let corrected = model.correct(&image);

        // Centre is (2, 5): pixel (0, 5) is 2 away, pixel (2, 0) is 5 away.
        assert_relative_eq!(corrected[[0, 5]], 3.0);
        assert_relative_eq!(corrected[[2, 0]], 6.0);
    }
}
