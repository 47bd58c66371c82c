use std::io::Write;

use tiff::encoder::compression::DeflateLevel;
use tiff::encoder::{Compression, TiffEncoder, colortype};
use tiff::tags::Predictor;
use tracing::debug;

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::raw::types::RawFrame;
use crate::image_pipeline::tiff::types::{EncodingConfig, TiffCompression};
use crate::image_pipeline::tiff::writer::TiffWriter;

pub struct StandardTiffWriter;

impl TiffWriter for StandardTiffWriter {
    fn write_tiff(&self, image: &RawFrame, output: &mut dyn Write, config: &EncodingConfig) -> Result<()> {
        debug!("Encoding TIFF image: {}x{}", image.width, image.height);

        let mut buffer = Vec::new();

        let compression = match config.compression {
            TiffCompression::None => Compression::Uncompressed,
            TiffCompression::Lzw => Compression::Lzw,
            TiffCompression::DeflateFast => Compression::Deflate(DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => Compression::Deflate(DeflateLevel::Balanced),
            TiffCompression::DeflateBest => Compression::Deflate(DeflateLevel::Best),
        };

        let mut encoder = TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| CalibrationError::EncodeError(e.to_string()))?
            .with_compression(compression);

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => Predictor::Horizontal,
                _ => Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        encoder
            .write_image::<colortype::Gray16>(image.width as u32, image.height as u32, &image.data)
            .map_err(|e| CalibrationError::EncodeError(e.to_string()))?;

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete, {} bytes", buffer.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::raw::{FrameReader, TiffFrameReader};

    #[test]
    fn test_written_tiff_decodes_back() {
        let frame = RawFrame::new(5, 2, vec![0, 1, 2, 65535, 4, 5, 6, 7, 8, 9]).unwrap();

        for compression in [TiffCompression::None, TiffCompression::Lzw, TiffCompression::DeflateBalanced] {
            let config = EncodingConfig::builder().compression(compression).build();
            let mut output = Vec::new();
            StandardTiffWriter.write_tiff(&frame, &mut output, &config).unwrap();

            let decoded = TiffFrameReader.read_frame(&output).unwrap();
            assert_eq!(decoded.data, frame.data);
        }
    }
}
