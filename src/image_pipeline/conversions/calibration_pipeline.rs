use std::io::Write;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::{Level, debug, info, info_span, warn};

use crate::image_pipeline::{
    calibration::{BandId, CalibrationMode, RadiometricCalibrator, quantize_unit_interval},
    common::{
        error::{CalibrationError, Result},
        timing::PipelineTimings,
    },
    config::CalibrationConfig,
    conversions::outcome::{Conversion, FrameOutcome},
    metadata::{ExiftoolSource, FrameMetadata, MetadataSource},
    raw::{FrameReader, TiffFrameReader},
    solar::{NoaaEphemeris, SolarEphemeris, compute_corrected_irradiance},
    tiff::{StandardTiffWriter, TiffWriter},
};

/// Stages a frame passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Decoding,
    BlackLevelRemoval,
    VignetteCorrection,
    MetadataExtraction,
    BandDispatch,
    SolarCorrection,
    RadiometricCalibration,
    Undistortion,
    Encoding,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Decoding => "decoding",
            PipelineStage::BlackLevelRemoval => "black_level_removal",
            PipelineStage::VignetteCorrection => "vignette_correction",
            PipelineStage::MetadataExtraction => "metadata_extraction",
            PipelineStage::BandDispatch => "band_dispatch",
            PipelineStage::SolarCorrection => "solar_correction",
            PipelineStage::RadiometricCalibration => "radiometric_calibration",
            PipelineStage::Undistortion => "undistortion",
            PipelineStage::Encoding => "encoding",
        }
    }
}

pub struct CalibrationPipeline<R: FrameReader, W: TiffWriter, M: MetadataSource, E: SolarEphemeris> {
    reader: R,
    writer: W,
    metadata: M,
    ephemeris: E,
    config: CalibrationConfig,
}

impl CalibrationPipeline<TiffFrameReader, StandardTiffWriter, ExiftoolSource, NoaaEphemeris> {
    pub fn new(config: CalibrationConfig) -> Result<Self> {
        let metadata = ExiftoolSource::new().with_timeout(config.metadata_timeout());
        Self::with_custom(TiffFrameReader, StandardTiffWriter, metadata, NoaaEphemeris, config)
    }
}

impl<R: FrameReader, W: TiffWriter, M: MetadataSource, E: SolarEphemeris> CalibrationPipeline<R, W, M, E> {
    pub fn with_custom(
        reader: R,
        writer: W,
        metadata: M,
        ephemeris: E,
        config: CalibrationConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reader,
            writer,
            metadata,
            ephemeris,
            config,
        })
    }

    /// Processes one file and reports the outcome instead of an error.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_dir: Q,
        mode: CalibrationMode,
    ) -> FrameOutcome {
        let input_path = input_path.as_ref();
        let span = info_span!("frame", input = %input_path.display(), %mode);
        let _entered = span.enter();

        let outcome = FrameOutcome::from(self.convert_file(input_path, output_dir, mode));
        if let FrameOutcome::Failed { kind, message } = &outcome {
            warn!(%kind, %message, "Frame failed");
        }
        outcome
    }

    /// Calibrates `input_path` into `output_dir`, which must already exist.
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_dir: Q,
        mode: CalibrationMode,
    ) -> Result<Conversion> {
        let input_path = input_path.as_ref();
        let output_dir = output_dir.as_ref();

        let band = {
            let _span = info_span!("stage", name = PipelineStage::BandDispatch.as_str()).entered();
            BandId::from_path(input_path)?
        };
        if band.is_skipped() {
            info!(input = %input_path.display(), %band, "Band has no calibration coefficients, skipping");
            return Ok(Conversion::Skipped);
        }

        let output_path = output_path_for(input_path, output_dir, mode)?;
        info!(
            input = %input_path.display(),
            output = %output_path.display(),
            %band,
            %mode,
            "Calibrating frame"
        );

        let input_data = {
            let _span = tracing::info_span!("read_input_file").entered();
            std::fs::read(input_path).map_err(|e| {
                CalibrationError::InputReadError(format!("{}: {}", input_path.display(), e))
            })?
        };

        // Encode fully before touching the filesystem so failures leave no file.
        let mut encoded = Vec::new();
        self.convert(&input_data, input_path, band, mode, &mut encoded)?;

        {
            let _span = tracing::info_span!("write_output_file").entered();
            std::fs::write(&output_path, &encoded).map_err(|e| {
                CalibrationError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })?;
        }

        info!(output = %output_path.display(), bytes = encoded.len(), "Frame written");
        Ok(Conversion::Written(output_path))
    }

    /// Runs every stage on in-memory bytes and encodes the result into `output`.
    ///
    /// `input_path` is only handed to the metadata source.
    pub fn convert(
        &self,
        input_data: &[u8],
        input_path: &Path,
        band: BandId,
        mode: CalibrationMode,
        output: &mut dyn Write,
    ) -> Result<()> {
        let timings = self.convert_with_timings(input_data, input_path, band, mode, output)?;
        timings.log_summary();
        Ok(())
    }

    pub fn convert_with_timings(
        &self,
        input_data: &[u8],
        input_path: &Path,
        band: BandId,
        mode: CalibrationMode,
        output: &mut dyn Write,
    ) -> Result<PipelineTimings> {
        let mut timings = PipelineTimings::new();
        let calibrated = self.calibrate_frame(input_data, input_path, band, mode, &mut timings)?;

        run_stage(&mut timings, PipelineStage::Encoding, || {
            let frame = quantize_unit_interval(&calibrated);
            self.writer.write_tiff(&frame, output, &self.config.encoding)
        })?;

        Ok(timings)
    }

    /// Decoding through undistortion; returns the unquantised raster.
    pub fn calibrate_frame(
        &self,
        input_data: &[u8],
        input_path: &Path,
        band: BandId,
        mode: CalibrationMode,
        timings: &mut PipelineTimings,
    ) -> Result<Array2<f64>> {
        let counts = run_stage(timings, PipelineStage::Decoding, || {
            let raw = self.reader.read_frame(input_data)?;
            debug!(
                width = raw.width,
                height = raw.height,
                bits_per_sample = raw.bits_per_sample,
                "Decoded frame"
            );
            raw.to_array()
        })?;
        log_range(PipelineStage::Decoding, &counts);

        let normalized = run_stage(timings, PipelineStage::BlackLevelRemoval, || {
            Ok(self.config.black_level.normalize(&counts))
        })?;
        log_range(PipelineStage::BlackLevelRemoval, &normalized);

        let devignetted = run_stage(timings, PipelineStage::VignetteCorrection, || {
            Ok(self.config.vignette.correct(&normalized))
        })?;
        log_range(PipelineStage::VignetteCorrection, &devignetted);

        let metadata = run_stage(timings, PipelineStage::MetadataExtraction, || {
            let tags = self.metadata.read_tags(input_path)?;
            FrameMetadata::from_tags(&tags, self.config.utc_offset()?)
        })?;

        let coefficients = run_stage(timings, PipelineStage::BandDispatch, || {
            self.config.bands.lookup(band).copied()
        })?;

        let corrected_irradiance = if mode.needs_irradiance() {
            let correction = run_stage(timings, PipelineStage::SolarCorrection, || {
                compute_corrected_irradiance(&self.ephemeris, &metadata, self.config.max_body_sun_angle)
            })?;
            Some(correction.corrected_irradiance)
        } else {
            None
        };

        let calibrator = RadiometricCalibrator::new(self.config.min_calibrated_irradiance);
        let calibrated = run_stage(timings, PipelineStage::RadiometricCalibration, || {
            calibrator.calibrate(&devignetted, &metadata, &coefficients, corrected_irradiance, mode)
        })?;
        log_range(PipelineStage::RadiometricCalibration, &calibrated);

        let undistorted = run_stage(timings, PipelineStage::Undistortion, || {
            self.config.camera.undistort(&calibrated)
        })?;
        log_range(PipelineStage::Undistortion, &undistorted);

        Ok(undistorted)
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: CalibrationConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }
}

fn run_stage<T>(
    timings: &mut PipelineTimings,
    stage: PipelineStage,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let _span = info_span!("stage", name = stage.as_str()).entered();
    timings.time(stage.as_str(), f)
}

fn log_range(stage: PipelineStage, image: &Array2<f64>) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    let (min, max) = image
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    debug!(stage = stage.as_str(), min, max, "Pixel value range");
}

/// `<stem><mode suffix>.<ext>` inside `output_dir`.
pub(crate) fn output_path_for(
    input_path: &Path,
    output_dir: &Path,
    mode: CalibrationMode,
) -> Result<PathBuf> {
    let stem = input_path.file_stem().ok_or_else(|| {
        CalibrationError::InputReadError(format!("no file name in {}", input_path.display()))
    })?;

    let mut name = stem.to_os_string();
    name.push(mode.suffix());
    if let Some(ext) = input_path.extension() {
        name.push(".");
        name.push(ext);
    }
    Ok(output_dir.join(name))
}
