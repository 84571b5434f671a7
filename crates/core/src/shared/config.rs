use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::constants::{
    DEFAULT_CAMERA_INDEX, DEFAULT_KERNEL_SIZE, DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_FPS,
    MAX_KERNEL_SIZE,
};
use super::error::FaceBlurError;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// What to do with a frame whose detection call failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionFailurePolicy {
    /// Blur the whole frame (fail closed).
    #[default]
    Obscure,
    /// Leave the frame unblurred (fail open).
    #[serde(alias = "passthrough")]
    PassThrough,
    /// Stop processing and return the detection error.
    Abort,
}

impl DetectionFailurePolicy {
    pub const ALL: &[DetectionFailurePolicy] = &[
        DetectionFailurePolicy::Obscure,
        DetectionFailurePolicy::PassThrough,
        DetectionFailurePolicy::Abort,
    ];
}

impl fmt::Display for DetectionFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionFailurePolicy::Obscure => write!(f, "obscure"),
            DetectionFailurePolicy::PassThrough => write!(f, "pass-through"),
            DetectionFailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for DetectionFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "obscure" => Ok(DetectionFailurePolicy::Obscure),
            "pass-through" | "passthrough" => Ok(DetectionFailurePolicy::PassThrough),
            "abort" => Ok(DetectionFailurePolicy::Abort),
            other => Err(format!(
                "failure policy must be one of: obscure, pass-through, abort, got '{other}'"
            )),
        }
    }
}

/// Tunables shared by all three entry operations.
#[derive(Clone, Debug, PartialEq)]
pub struct BlurConfig {
    /// Box blur kernel edge length in pixels (1 = no-op).
    pub kernel_size: usize,
    /// Fixed frame rate of muxed output videos.
    pub output_fps: f64,
    /// Root under which `images/` and `video/` are created.
    pub output_dir: PathBuf,
    /// Minimum detector score for a box to be reported.
    pub confidence: f64,
    /// System capture device index for live mode.
    pub camera_index: u32,
    pub failure_policy: DetectionFailurePolicy,
}

impl Default for BlurConfig {
    fn default() -> Self {
        Self {
            kernel_size: DEFAULT_KERNEL_SIZE,
            output_fps: DEFAULT_OUTPUT_FPS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            confidence: DEFAULT_CONFIDENCE,
            camera_index: DEFAULT_CAMERA_INDEX,
            failure_policy: DetectionFailurePolicy::default(),
        }
    }
}

impl BlurConfig {
    pub fn validate(&self) -> Result<(), FaceBlurError> {
        if !(1..=MAX_KERNEL_SIZE).contains(&self.kernel_size) {
            return Err(FaceBlurError::InvalidConfig(format!(
                "kernel size must be between 1 and {MAX_KERNEL_SIZE}, got {}",
                self.kernel_size
            )));
        }
        if !(self.output_fps.is_finite() && self.output_fps > 0.0) {
            return Err(FaceBlurError::InvalidConfig(format!(
                "output fps must be positive, got {}",
                self.output_fps
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(FaceBlurError::InvalidConfig(format!(
                "confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            )));
        }
        Ok(())
    }
}
