//! Typed view of the tags one frame needs for radiometric correction.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use regex::Regex;
use tracing::debug;

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::metadata::source::TagMap;

/// Tag names as reported by `exiftool -G`.
pub mod tags {
    pub const SENSOR_GAIN: &str = "XMP:SensorGain";
    pub const SENSOR_GAIN_ADJUSTMENT: &str = "XMP:SensorGainAdjustment";
    pub const EXPOSURE_TIME: &str = "XMP:ExposureTime";
    pub const IRRADIANCE: &str = "XMP:Irradiance";
    pub const FLIGHT_PITCH: &str = "XMP:FlightPitchDegree";
    pub const FLIGHT_ROLL: &str = "XMP:FlightRollDegree";
    pub const FLIGHT_YAW: &str = "XMP:FlightYawDegree";
    pub const GPS_LATITUDE: &str = "XMP:GPSLatitude";
    pub const GPS_LONGITUDE: &str = "XMP:GPSLongitude";
    pub const DATE_TIME_ORIGINAL: &str = "EXIF:DateTimeOriginal";
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static DMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\d+) deg (\d+)' (\d+\.\d+)" ([NSEW])"#).expect("DMS pattern is valid")
});

/// Aircraft attitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

/// Signed decimal degrees, north and east positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameMetadata {
    pub sensor_gain: f64,
    /// Exposure time in the camera's native unit (microseconds on the P4M).
    pub exposure_time: f64,
    /// Raw reading of the onboard sunlight sensor.
    pub irradiance: f64,
    pub sensor_gain_adjustment: Option<f64>,
    pub attitude: Attitude,
    pub position: GeoPosition,
    pub captured_at: DateTime<FixedOffset>,
}

impl FrameMetadata {
    /// Parses every required tag; the capture time is read as local time in
    /// `local_offset`.
    pub fn from_tags(tag_map: &TagMap, local_offset: FixedOffset) -> Result<Self> {
        let sensor_gain = positive(tag_map, tags::SENSOR_GAIN)?;
        let exposure_time = positive(tag_map, tags::EXPOSURE_TIME)?;
        let irradiance = number(tag_map, tags::IRRADIANCE)?;
        let sensor_gain_adjustment = match tag_map.get(tags::SENSOR_GAIN_ADJUSTMENT) {
            Some(_) => Some(number(tag_map, tags::SENSOR_GAIN_ADJUSTMENT)?),
            None => None,
        };

        let attitude = Attitude {
            pitch: number(tag_map, tags::FLIGHT_PITCH)?,
            roll: number(tag_map, tags::FLIGHT_ROLL)?,
            yaw: number(tag_map, tags::FLIGHT_YAW)?,
        };

        let position = GeoPosition {
            latitude: dms_to_decimal(required(tag_map, tags::GPS_LATITUDE)?)?,
            longitude: dms_to_decimal(required(tag_map, tags::GPS_LONGITUDE)?)?,
        };

        let naive = parse_capture_timestamp(required(tag_map, tags::DATE_TIME_ORIGINAL)?)?;
        let captured_at = local_offset
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| {
                CalibrationError::MetadataError(format!("ambiguous local time {}", naive))
            })?;

        let metadata = Self {
            sensor_gain,
            exposure_time,
            irradiance,
            sensor_gain_adjustment,
            attitude,
            position,
            captured_at,
        };
        debug!(
            gain = metadata.sensor_gain,
            exposure = metadata.exposure_time,
            irradiance = metadata.irradiance,
            gain_adjustment = ?metadata.sensor_gain_adjustment,
            pitch = attitude.pitch,
            roll = attitude.roll,
            yaw = attitude.yaw,
            latitude = position.latitude,
            longitude = position.longitude,
            captured_at = %metadata.captured_at,
            "Parsed frame metadata"
        );
        Ok(metadata)
    }
}

/// Converts `"35 deg 12' 30.00\" N"` style strings to signed decimal degrees.
pub fn dms_to_decimal(dms: &str) -> Result<f64> {
    let caps = DMS_PATTERN.captures(dms).ok_or_else(|| {
        CalibrationError::MetadataError(format!("coordinate {:?} is not deg/min/sec/direction", dms))
    })?;

    let field = |i: usize| -> Result<f64> {
        caps[i].parse::<f64>().map_err(|e| {
            CalibrationError::MetadataError(format!("coordinate {:?}: {}", dms, e))
        })
    };
    let decimal = field(1)? + field(2)? / 60.0 + field(3)? / 3600.0;

    Ok(match &caps[4] {
        "S" | "W" => -decimal,
        _ => decimal,
    })
}

/// Parses EXIF `YYYY:MM:DD HH:MM:SS` by turning the date colons into dashes.
pub fn parse_capture_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let normalized = raw.trim().replacen(':', "-", 2);
    NaiveDateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT).map_err(|e| {
        CalibrationError::MetadataError(format!("timestamp {:?}: {}", raw, e))
    })
}

fn required<'a>(tag_map: &'a TagMap, key: &str) -> Result<&'a str> {
    tag_map.get(key)
        .map(String::as_str)
        .ok_or_else(|| CalibrationError::MetadataError(format!("missing tag {}", key)))
}

/// Accepts plain decimals and `num/den` rationals.
fn number(tag_map: &TagMap, key: &str) -> Result<f64> {
    let raw = required(tag_map, key)?.trim();
    let malformed = || CalibrationError::MetadataError(format!("tag {} has non-numeric value {:?}", key, raw));

    let value = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().map_err(|_| malformed())?;
            let den: f64 = den.trim().parse().map_err(|_| malformed())?;
            num / den
        }
        None => raw.parse().map_err(|_| malformed())?,
    };

    if !value.is_finite() {
        return Err(malformed());
    }
    Ok(value)
}

fn positive(tag_map: &TagMap, key: &str) -> Result<f64> {
    let value = number(tag_map, key)?;
    if value <= 0.0 {
        return Err(CalibrationError::MetadataError(format!(
            "tag {} must be positive, got {}",
            key, value
        )));
    }
    Ok(value)
}
