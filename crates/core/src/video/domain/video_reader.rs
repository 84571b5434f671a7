use std::fmt;
use std::path::PathBuf;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoSource {
    File(PathBuf),
    /// Capture device, by platform index.
    Camera(u32),
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Camera(index) => write!(f, "camera {index}"),
        }
    }
}

/// Reads frames from a video file, still image or capture device.
///
/// Implementations handle I/O details (codec, container format, device
/// backend) while the pipeline works with the abstract `Frame` and
/// `VideoMetadata` types. Frames carry a millisecond timestamp that never
/// decreases within one stream.
pub trait VideoReader: Send {
    /// Opens the source and returns its metadata.
    fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in decode order. For a camera the
    /// iterator ends only when the device stops delivering frames.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
