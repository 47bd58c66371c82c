use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use p4m_calib_rs::image_pipeline::{
    CalibrationConfig, CalibrationMode, CalibrationPipeline, ExiftoolSource, FrameOutcome,
    NoaaEphemeris, StandardTiffWriter, TiffFrameReader,
};
use p4m_calib_rs::logger;

#[derive(Parser, Debug)]
#[command(name = "p4m-calibrate")]
#[command(about = "Radiometric calibration of multispectral drone frames")]
struct Args {
    /// Input frames; band 1 files are skipped
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for calibrated TIFFs, created if missing
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// radiance or reflectance
    #[arg(short, long, default_value = "reflectance")]
    mode: CalibrationMode,

    /// JSON calibration config overriding the built-in constants
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// exiftool executable
    #[arg(long, default_value = "exiftool")]
    exiftool: PathBuf,

    /// Seconds to wait for exiftool per frame
    #[arg(long)]
    metadata_timeout: Option<u64>,

    /// Offset of the camera clock from UTC, in hours
    #[arg(long, allow_negative_numbers = true)]
    utc_offset: Option<f64>,
}

fn load_config(args: &Args) -> Result<CalibrationConfig> {
    let mut config = match &args.config {
        Some(path) => CalibrationConfig::from_json_file(path)?,
        None => CalibrationConfig::default(),
    };
    if let Some(secs) = args.metadata_timeout {
        config.metadata_timeout_secs = secs;
    }
    if let Some(hours) = args.utc_offset {
        config.utc_offset_minutes = (hours * 60.0).round() as i32;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<ExitCode> {
    logger::init();
    let args = Args::parse();

    let config = load_config(&args)?;
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating output directory {}", args.output_dir.display()))?;

    let metadata = ExiftoolSource::new()
        .with_program(&args.exiftool)
        .with_timeout(config.metadata_timeout());
    let pipeline = CalibrationPipeline::with_custom(
        TiffFrameReader,
        StandardTiffWriter,
        metadata,
        NoaaEphemeris,
        config,
    )?;

    info!(
        frames = args.inputs.len(),
        mode = %args.mode,
        output_dir = %args.output_dir.display(),
        "Calibration pipeline initialized"
    );

    let (mut written, mut skipped, mut failed) = (0usize, 0usize, 0usize);
    for input in &args.inputs {
        match pipeline.run(input, &args.output_dir, args.mode) {
            FrameOutcome::Written(path) => {
                written += 1;
                info!(input = %input.display(), output = %path.display(), "Frame calibrated");
            }
            FrameOutcome::Skipped => skipped += 1,
            FrameOutcome::Failed { kind, message } => {
                failed += 1;
                error!(input = %input.display(), %kind, "{}", message);
            }
        }
    }

    info!(written, skipped, failed, "Calibration finished");
    if failed > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
