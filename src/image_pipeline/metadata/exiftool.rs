//! Metadata source backed by the `exiftool` executable.
//!
//! Runs `exiftool -j -G <file>` and flattens the first JSON object into a
//! [`TagMap`]. Group-prefixed keys (`XMP:SensorGain`, `EXIF:DateTimeOriginal`)
//! are what [`FrameMetadata`](super::FrameMetadata) expects.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use crate::image_pipeline::common::error::{CalibrationError, Result};
use crate::image_pipeline::metadata::source::{MetadataSource, TagMap};

const DEFAULT_PROGRAM: &str = "exiftool";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct ExiftoolSource {
    program: PathBuf,
    timeout: Duration,
}

impl Default for ExiftoolSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ExiftoolSource {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl MetadataSource for ExiftoolSource {
    fn read_tags(&self, path: &Path) -> Result<TagMap> {
        debug!(file = %path.display(), program = %self.program.display(), "Running exiftool");

        let mut child = Command::new(&self.program)
            .arg("-j")
            .arg("-G")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                CalibrationError::MetadataError(format!(
                    "failed to launch {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        let mut stdout = child.stdout.take().ok_or_else(|| {
            CalibrationError::MetadataError("exiftool stdout was not captured".to_string())
        })?;
        // Drain stdout concurrently so a full pipe cannot stall the child.
        let collector = thread::spawn(move || {
            let mut buffer = Vec::new();
            stdout.read_to_end(&mut buffer).map(|_| buffer)
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                warn!(file = %path.display(), "exiftool timed out, killing it");
                let _ = child.kill();
                let _ = child.wait();
                return Err(CalibrationError::MetadataError(format!(
                    "exiftool did not finish within {:?}",
                    self.timeout
                )));
            }
            thread::sleep(POLL_INTERVAL);
        };

        let output = collector
            .join()
            .map_err(|_| CalibrationError::MetadataError("exiftool reader thread panicked".to_string()))?
            .map_err(|e| CalibrationError::MetadataError(format!("reading exiftool output: {}", e)))?;

        if !status.success() {
            return Err(CalibrationError::MetadataError(format!(
                "exiftool exited with {} for {}",
                status,
                path.display()
            )));
        }

        parse_exiftool_json(&output)
    }
}

/// Flattens `exiftool -j` output into a tag map.
///
/// Only the first object is used. Numbers and booleans are stored in their
/// JSON text form; nulls are dropped.
pub fn parse_exiftool_json(bytes: &[u8]) -> Result<TagMap> {
    let documents: Vec<serde_json::Map<String, Value>> = serde_json::from_slice(bytes)
        .map_err(|e| CalibrationError::MetadataError(format!("invalid exiftool JSON: {}", e)))?;

    let first = documents.into_iter().next().ok_or_else(|| {
        CalibrationError::MetadataError("exiftool returned no records".to_string())
    })?;

    let tags = first
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s,
                other => other.to_string(),
            };
            Some((key, text))
        })
        .collect();
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flattens_values() {
        let json = br#"[{
            "SourceFile": "IMG_0013.TIF",
            "XMP:SensorGain": 1.5,
            "XMP:GPSLatitude": "35 deg 12' 30.00\" N",
            "XMP:BlackCurrent": null,
            "EXIF:DateTimeOriginal": "2023:06:15 10:30:00"
        }]"#;

        let tags = parse_exiftool_json(json).unwrap();
        assert_eq!(tags["XMP:SensorGain"], "1.5");
        assert_eq!(tags["XMP:GPSLatitude"], "35 deg 12' 30.00\" N");
        assert_eq!(tags["EXIF:DateTimeOriginal"], "2023:06:15 10:30:00");
        assert!(!tags.contains_key("XMP:BlackCurrent"));
    }

    #[test]
    fn test_parse_rejects_empty_and_invalid() {
        assert!(matches!(
            parse_exiftool_json(b"[]"),
            Err(CalibrationError::MetadataError(_))
        ));
        assert!(matches!(
            parse_exiftool_json(b"not json"),
            Err(CalibrationError::MetadataError(_))
        ));
    }

    #[test]
    fn test_missing_program_is_metadata_error() {
        let source = ExiftoolSource::new().with_program("/nonexistent/exiftool-binary");
        let result = source.read_tags(Path::new("frame.TIF"));
        assert!(matches!(result, Err(CalibrationError::MetadataError(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_slow_child() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-exiftool");
        std::fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let source = ExiftoolSource::new()
            .with_program(&script)
            .with_timeout(Duration::from_millis(100));
        let started = Instant::now();
        let result = source.read_tags(Path::new("frame.TIF"));

        assert!(matches!(result, Err(CalibrationError::MetadataError(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
