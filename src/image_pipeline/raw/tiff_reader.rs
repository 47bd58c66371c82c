//! Frame reader for 16-bit single-band TIFF files.
//!
//! Multispectral cameras store each band as its own grayscale TIFF. The
//! samples are returned at their stored depth; nothing is rescaled here.

use std::io::Cursor;

use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tracing::debug;

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::raw::reader::FrameReader;
use crate::image_pipeline::raw::types::RawFrame;

pub struct TiffFrameReader;

impl FrameReader for TiffFrameReader {
    /// Decodes a grayscale TIFF into a [`RawFrame`].
    ///
    /// 8-bit rasters are widened to `u16` without scaling; every other
    /// color type is rejected with [`CalibrationError::DecodeError`].
    fn read_frame(&self, data: &[u8]) -> Result<RawFrame> {
        debug!("Decoding TIFF frame, {} bytes", data.len());

        let mut decoder = Decoder::new(Cursor::new(data))
            .map_err(|e| CalibrationError::DecodeError(e.to_string()))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| CalibrationError::DecodeError(e.to_string()))?;
        let color_type = decoder
            .colortype()
            .map_err(|e| CalibrationError::DecodeError(e.to_string()))?;

        let bits_per_sample = match color_type {
            ColorType::Gray(bits @ (8 | 16)) => u32::from(bits),
            other => {
                return Err(CalibrationError::DecodeError(format!(
                    "unsupported color type {:?}, expected single-band grayscale",
                    other
                )));
            }
        };

        let samples: Vec<u16> = match decoder
            .read_image()
            .map_err(|e| CalibrationError::DecodeError(e.to_string()))?
        {
            DecodingResult::U16(values) => values,
            DecodingResult::U8(values) => values.into_iter().map(u16::from).collect(),
            _ => {
                return Err(CalibrationError::DecodeError(
                    "decoder yielded no integer samples".to_string(),
                ));
            }
        };

        debug!("Decoded frame: {}x{} @ {} bits", width, height, bits_per_sample);

        let mut frame = RawFrame::new(width as usize, height as usize, samples)
            .map_err(|_| {
                CalibrationError::DecodeError(format!(
                    "sample count does not match {}x{}",
                    width, height
                ))
            })?;
        frame.bits_per_sample = bits_per_sample;
        Ok(frame)
    }
}
