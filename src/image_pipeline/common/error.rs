use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode input raster: {0}")]
    DecodeError(String),

    #[error("Failed to encode TIFF image: {0}")]
    EncodeError(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Missing or malformed metadata: {0}")]
    MetadataError(String),

    #[error("Unknown band: {0}")]
    UnknownBandError(String),

    #[error("Solar position lookup failed: {0}")]
    EphemerisError(String),

    #[error("Numeric singularity: {0}")]
    NumericError(String),

    #[error("Invalid calibration config: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse failure category reported per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Decode,
    Metadata,
    UnknownBand,
    Ephemeris,
    Numeric,
    Config,
    Io,
}

impl CalibrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalibrationError::InputReadError(_)
            | CalibrationError::DecodeError(_)
            | CalibrationError::InvalidDimensions(..) => ErrorKind::Decode,
            CalibrationError::MetadataError(_) => ErrorKind::Metadata,
            CalibrationError::UnknownBandError(_) => ErrorKind::UnknownBand,
            CalibrationError::EphemerisError(_) => ErrorKind::Ephemeris,
            CalibrationError::NumericError(_) => ErrorKind::Numeric,
            CalibrationError::ConfigError(_) => ErrorKind::Config,
            CalibrationError::OutputWriteError(_)
            | CalibrationError::EncodeError(_)
            | CalibrationError::IoError(_) => ErrorKind::Io,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Decode => "DecodeError",
            ErrorKind::Metadata => "MetadataError",
            ErrorKind::UnknownBand => "UnknownBandError",
            ErrorKind::Ephemeris => "EphemerisError",
            ErrorKind::Numeric => "NumericError",
            ErrorKind::Config => "ConfigError",
            ErrorKind::Io => "IoError",
        };
        f.write_str(name)
    }
}

pub type Result<T> = std::result::Result<T, CalibrationError>;
