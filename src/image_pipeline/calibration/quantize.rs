use ndarray::Array2;

use crate::image_pipeline::raw::types::RawFrame;

/// `round(clip(x, 0, 1) · 65535)`; NaN becomes 0.
pub fn quantize_unit_interval(image: &Array2<f64>) -> RawFrame {
    let (rows, cols) = image.dim();
    let data = image
        .iter()
        .map(|&v| {
            if v.is_nan() {
                0
            } else {
                (v.clamp(0.0, 1.0) * f64::from(u16::MAX)).round() as u16
            }
        })
        .collect();

    RawFrame {
        width: cols,
        height: rows,
        data,
        bits_per_sample: 16,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_endpoints_and_clipping() {
        let frame = quantize_unit_interval(&array![[0.0, 1.0, 1.5, -0.2], [0.5, f64::NAN, f64::INFINITY, 1e-6]]);
        assert_eq!((frame.width, frame.height), (4, 2));
        assert_eq!(frame.data, vec![0, 65535, 65535, 0, 32768, 0, 65535, 0]);
    }
}
