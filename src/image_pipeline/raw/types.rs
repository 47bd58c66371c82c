//! Raster data types

use ndarray::Array2;

use crate::image_pipeline::common::error::{CalibrationError, Result};

/// Single-channel 16-bit raster, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// Digital counts, `height` rows of `width` samples
    pub data: Vec<u16>,
    /// Bits per sample as stored in the container
    pub bits_per_sample: u32,
}

impl RawFrame {
    pub fn new(width: usize, height: usize, data: Vec<u16>) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(CalibrationError::InvalidDimensions(width, height));
        }
        Ok(Self {
            width,
            height,
            data,
            bits_per_sample: 16,
        })
    }

    /// Digital counts as a `(rows, cols)` floating-point grid.
    pub fn to_array(&self) -> Result<Array2<f64>> {
        let values = self.data.iter().map(|&v| f64::from(v)).collect();
        Array2::from_shape_vec((self.height, self.width), values)
            .map_err(|_| CalibrationError::InvalidDimensions(self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_array_is_row_major() {
        let frame = RawFrame::new(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let grid = frame.to_array().unwrap();
        assert_eq!(grid.dim(), (2, 3));
        assert_eq!(grid[[0, 2]], 3.0);
        assert_eq!(grid[[1, 0]], 4.0);
    }

    #[test]
    fn test_mismatched_length_rejected() {
        let result = RawFrame::new(4, 4, vec![0; 15]);
        assert!(matches!(result, Err(CalibrationError::InvalidDimensions(4, 4))));
    }
}
