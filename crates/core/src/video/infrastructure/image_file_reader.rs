use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{VideoReader, VideoSource};

/// Adapts a single still image to the [`VideoReader`] interface.
///
/// The image is a one-frame stream with `fps=0` and `total_frames=1`.
/// Decoding goes through the `image` crate, so the format is sniffed from
/// the file contents rather than trusted from the extension.
pub struct ImageFileReader {
    frame: Option<Frame>,
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self { frame: None }
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, source: &VideoSource) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let VideoSource::File(path) = source else {
            return Err(format!("{source} is not an image file").into());
        };

        let img = image::ImageReader::open(path)?
            .with_guessed_format()?
            .decode()?
            .to_rgb8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(format!("{} has no pixels", path.display()).into());
        }

        self.frame = Some(Frame::new(img.into_raw(), width, height, 3, 0).with_timestamp_ms(0));

        Ok(VideoMetadata {
            width,
            height,
            fps: 0.0,
            total_frames: 1,
            codec: String::new(),
            source_path: Some(path.clone()),
        })
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        match self.frame.take() {
            Some(frame) => Box::new(std::iter::once(Ok(frame))),
            None => Box::new(std::iter::once(Err("ImageFileReader: not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.frame = None;
    }
}
