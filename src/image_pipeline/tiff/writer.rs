use std::io::Write;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::raw::types::RawFrame;
use crate::image_pipeline::tiff::types::EncodingConfig;

pub trait TiffWriter {
    fn write_tiff(&self, image: &RawFrame, output: &mut dyn Write, config: &EncodingConfig) -> Result<()>;
}
