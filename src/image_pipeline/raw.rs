//! Raster reading module
//!
//! This module provides the decoder seam for single-band 16-bit sensor frames.

mod reader;
mod tiff_reader;
pub mod types;

pub use reader::FrameReader;
pub use tiff_reader::TiffFrameReader;
pub use types::RawFrame;
