use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Factory for the codec adapters a run needs.
pub trait MediaBackend: Send + Sync {
    fn image_reader(&self) -> Box<dyn VideoReader>;
    fn video_reader(&self) -> Box<dyn VideoReader>;
    /// Reader for capture devices.
    fn camera_reader(&self) -> Box<dyn VideoReader>;
    fn image_writer(&self) -> Box<dyn ImageWriter>;
    fn video_writer(&self) -> Box<dyn VideoWriter>;
}
