use crate::pipeline::media_backend::MediaBackend;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;
use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use crate::video::infrastructure::image_file_reader::ImageFileReader;
use crate::video::infrastructure::image_file_writer::ImageFileWriter;

/// Production codecs: `image` for stills, ffmpeg for video files and
/// capture devices.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegMediaBackend;

impl MediaBackend for FfmpegMediaBackend {
    fn image_reader(&self) -> Box<dyn VideoReader> {
        Box::new(ImageFileReader::new())
    }

    fn video_reader(&self) -> Box<dyn VideoReader> {
        Box::new(FfmpegReader::new())
    }

    fn camera_reader(&self) -> Box<dyn VideoReader> {
        Box::new(FfmpegReader::new())
    }

    fn image_writer(&self) -> Box<dyn ImageWriter> {
        Box::new(ImageFileWriter::new())
    }

    fn video_writer(&self) -> Box<dyn VideoWriter> {
        Box::new(FfmpegWriter::new())
    }
}
