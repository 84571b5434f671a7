use std::path::PathBuf;

use thiserror::Error;

use crate::detection::domain::operating_mode::OperatingMode;

/// Application-level failures surfaced by the use cases and the orchestrator.
///
/// Infrastructure adapters report `Box<dyn Error>`; the use cases classify
/// those into one of these variants at the boundary.
#[derive(Error, Debug)]
pub enum FaceBlurError {
    #[error("failed to load detector model {}: {message}", path.display())]
    AssetLoad { path: PathBuf, message: String },

    #[error("failed to decode {input}: {message}")]
    Decode { input: String, message: String },

    #[error("face detection failed on frame {frame_index}: {message}")]
    Detection { frame_index: usize, message: String },

    #[error("failed to blur frame {frame_index}: {message}")]
    Blur { frame_index: usize, message: String },

    #[error("failed to encode {}: {message}", output.display())]
    Encode { output: PathBuf, message: String },

    #[error("display failed: {0}")]
    Display(String),

    #[error("{requested} call not allowed: detector was configured for {configured} mode")]
    ModeMismatch {
        requested: OperatingMode,
        configured: OperatingMode,
    },

    #[error("timestamp {timestamp_ms}ms is earlier than the previous timestamp {previous_ms}ms")]
    NonMonotonicTimestamp { timestamp_ms: i64, previous_ms: i64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FaceBlurError {
    pub fn decode(input: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            input: input.into(),
            message: err.to_string(),
        }
    }

    pub fn encode(output: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            output: output.into(),
            message: err.to_string(),
        }
    }

    pub fn detection(frame_index: usize, err: impl std::fmt::Display) -> Self {
        Self::Detection {
            frame_index,
            message: err.to_string(),
        }
    }

    pub fn blur(frame_index: usize, err: impl std::fmt::Display) -> Self {
        Self::Blur {
            frame_index,
            message: err.to_string(),
        }
    }

    pub fn asset_load(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::AssetLoad {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message_includes_input() {
        let err = FaceBlurError::decode("missing.png", "No such file or directory");
        let msg = err.to_string();
        assert!(msg.contains("missing.png"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn test_encode_message_includes_path() {
        let err = FaceBlurError::encode("outputs/video/a.avi", "no frames to write");
        assert_eq!(
            err.to_string(),
            "failed to encode outputs/video/a.avi: no frames to write"
        );
    }

    #[test]
    fn test_mode_mismatch_message() {
        let err = FaceBlurError::ModeMismatch {
            requested: OperatingMode::Video,
            configured: OperatingMode::SingleImage,
        };
        assert_eq!(
            err.to_string(),
            "video call not allowed: detector was configured for single-image mode"
        );
    }

    #[test]
    fn test_detection_message_includes_frame() {
        let err = FaceBlurError::detection(12, "inference failed");
        assert!(err.to_string().contains("frame 12"));
    }
}
