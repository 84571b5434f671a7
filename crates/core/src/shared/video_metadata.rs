use std::path::PathBuf;

/// Properties of an opened frame source.
///
/// Still images are a single-frame source with `fps = 0`; cameras report
/// `total_frames = 0` because the stream length is unknown.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Metadata for an output video assembled from `frames` frames of the
    /// given size at a fixed frame rate.
    pub fn for_output(width: u32, height: u32, fps: f64, frames: usize) -> Self {
        Self {
            width,
            height,
            fps,
            total_frames: frames,
            codec: String::new(),
            source_path: None,
        }
    }

    /// Millisecond timestamp for frame `index`, derived from the frame rate.
    ///
    /// Returns `None` when the rate is unknown.
    pub fn timestamp_for_index(&self, index: usize) -> Option<i64> {
        if self.fps > 0.0 {
            Some((index as f64 * 1000.0 / self.fps).round() as i64)
        } else {
            None
        }
    }
}
