use std::path::{Path, PathBuf};

use crate::image_pipeline::common::error::{ErrorKind, Result};

/// Successful end states of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    Written(PathBuf),
    /// Band 1: nothing is produced, and that is not a failure.
    Skipped,
}

/// Per-frame result handed back to callers; never panics or propagates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Written(PathBuf),
    Skipped,
    Failed { kind: ErrorKind, message: String },
}

impl FrameOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FrameOutcome::Failed { .. })
    }

    pub fn output_path(&self) -> Option<&Path> {
        match self {
            FrameOutcome::Written(path) => Some(path),
            _ => None,
        }
    }
}

impl From<Result<Conversion>> for FrameOutcome {
    fn from(result: Result<Conversion>) -> Self {
        match result {
            Ok(Conversion::Written(path)) => FrameOutcome::Written(path),
            Ok(Conversion::Skipped) => FrameOutcome::Skipped,
            Err(e) => FrameOutcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}
