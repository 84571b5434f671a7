use std::path::Path;
use std::time::Instant;

use crate::blurring::domain::frame_blurrer::FrameBlurrer;
use crate::detection::domain::detector_runner::DetectorRunner;
use crate::pipeline::detection_fallback::regions_after_failure;
use crate::pipeline::pipeline_logger::{elapsed_ms, PipelineLogger};
use crate::shared::config::DetectionFailurePolicy;
use crate::shared::error::FaceBlurError;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::{VideoReader, VideoSource};

/// Single-image blurring pipeline: read → detect → blur → write.
pub struct BlurImageUseCase {
    reader: Box<dyn VideoReader>,
    image_writer: Box<dyn ImageWriter>,
    runner: DetectorRunner,
    blurrer: Box<dyn FrameBlurrer>,
    failure_policy: DetectionFailurePolicy,
    logger: Box<dyn PipelineLogger>,
}

impl BlurImageUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        image_writer: Box<dyn ImageWriter>,
        runner: DetectorRunner,
        blurrer: Box<dyn FrameBlurrer>,
        failure_policy: DetectionFailurePolicy,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            image_writer,
            runner,
            blurrer,
            failure_policy,
            logger,
        }
    }

    /// Reads one image, blurs every detected face and writes the result to
    /// `output_path`. Returns the number of regions blurred.
    pub fn execute(&mut self, input_path: &Path, output_path: &Path) -> Result<usize, FaceBlurError> {
        let input = input_path.display().to_string();

        let t = Instant::now();
        self.reader
            .open(&VideoSource::File(input_path.to_path_buf()))
            .map_err(|e| FaceBlurError::decode(&input, e))?;
        let frame = self
            .reader
            .frames()
            .next()
            .unwrap_or_else(|| Err("image contains no frames".into()));
        self.reader.close();
        let mut frame = frame.map_err(|e| FaceBlurError::decode(&input, e))?;
        self.logger.timing("decode", elapsed_ms(t));

        let t = Instant::now();
        let regions = match self.runner.detect(&frame) {
            Ok(result) => result.boxes,
            Err(e @ FaceBlurError::Detection { .. }) => {
                regions_after_failure(self.failure_policy, &frame, e)?
            }
            Err(e) => return Err(e),
        };
        self.logger.timing("detect", elapsed_ms(t));
        self.logger.metric("faces", regions.len() as f64);

        let t = Instant::now();
        self.blurrer
            .blur(&mut frame, &regions)
            .map_err(|e| FaceBlurError::blur(frame.index(), e))?;
        self.logger.timing("blur", elapsed_ms(t));

        let t = Instant::now();
        self.image_writer
            .write(output_path, &frame)
            .map_err(|e| FaceBlurError::encode(output_path, e))?;
        self.logger.timing("encode", elapsed_ms(t));

        self.logger.progress(1, 1);
        self.logger.info(&format!(
            "Blurred {} region(s) in {} → {}",
            regions.len(),
            input,
            output_path.display()
        ));
        self.logger.summary();
        Ok(regions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::detection::domain::operating_mode::OperatingMode;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::frame::Frame;
    use crate::shared::video_metadata::VideoMetadata;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubImageReader {
        frame: Option<Frame>,
        fail_open: bool,
    }

    impl VideoReader for StubImageReader {
        fn open(
            &mut self,
            _source: &VideoSource,
        ) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("No such file or directory".into());
            }
            Ok(VideoMetadata::for_output(4, 4, 0.0, 1))
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(self.frame.take().into_iter().map(Ok))
        }

        fn close(&mut self) {}
    }

    type Written = Arc<Mutex<Vec<(PathBuf, Frame)>>>;

    struct StubImageWriter {
        written: Written,
        fail: bool,
    }

    impl ImageWriter for StubImageWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail {
                return Err("disk full".into());
            }
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

    struct StubDetector {
        result: Result<Vec<BoundingBox>, String>,
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            self.result.clone().map_err(Into::into)
        }
    }

    /// Paints every pixel of each region with 255 so tests can see what was blurred.
    struct MarkingBlurrer;

    impl FrameBlurrer for MarkingBlurrer {
        fn blur(
            &self,
            frame: &mut Frame,
            boxes: &[BoundingBox],
        ) -> Result<(), Box<dyn std::error::Error>> {
            for b in boxes {
                let Some(c) = b.clamp_to(frame.width(), frame.height()) else {
                    continue;
                };
                let mut view = frame.as_ndarray_mut();
                for y in c.y..c.y + c.height {
                    for x in c.x..c.x + c.width {
                        for ch in 0..3 {
                            view[[y as usize, x as usize, ch]] = 255;
                        }
                    }
                }
            }
            Ok(())
        }
    }

    struct Harness {
        reader: StubImageReader,
        writer_fails: bool,
        detector: StubDetector,
        policy: DetectionFailurePolicy,
    }

    impl Harness {
        fn new(detected: Result<Vec<BoundingBox>, String>) -> Self {
            Self {
                reader: StubImageReader {
                    frame: Some(Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, 0)),
                    fail_open: false,
                },
                writer_fails: false,
                detector: StubDetector { result: detected },
                policy: DetectionFailurePolicy::default(),
            }
        }

        fn run(self) -> (Result<usize, FaceBlurError>, Written) {
            let written: Written = Arc::new(Mutex::new(Vec::new()));
            let runner =
                DetectorRunner::new(Box::new(self.detector), OperatingMode::SingleImage, None)
                    .unwrap();
            let mut use_case = BlurImageUseCase::new(
                Box::new(self.reader),
                Box::new(StubImageWriter {
                    written: written.clone(),
                    fail: self.writer_fails,
                }),
                runner,
                Box::new(MarkingBlurrer),
                self.policy,
                Box::new(NullPipelineLogger),
            );
            let result = use_case.execute(Path::new("in.png"), Path::new("out/in.png"));
            (result, written)
        }
    }

    fn marked_pixels(frame: &Frame) -> usize {
        frame.data().chunks(3).filter(|p| p[0] == 255).count()
    }

    #[test]
    fn test_blurs_detected_region_and_writes_output() {
        let (result, written) = Harness::new(Ok(vec![BoundingBox::new(1, 1, 2, 2)])).run();
        assert_eq!(result.unwrap(), 1);

        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("out/in.png"));
        assert_eq!(marked_pixels(&written[0].1), 4);
    }

    #[test]
    fn test_no_faces_leaves_image_unchanged() {
        let (result, written) = Harness::new(Ok(vec![])).run();
        assert_eq!(result.unwrap(), 0);
        assert!(written.lock().unwrap()[0].1.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_unreadable_input_is_decode_error() {
        let mut harness = Harness::new(Ok(vec![]));
        harness.reader.fail_open = true;
        let (result, written) = harness.run();
        assert!(matches!(result, Err(FaceBlurError::Decode { .. })));
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_input_is_decode_error() {
        let mut harness = Harness::new(Ok(vec![]));
        harness.reader.frame = None;
        assert!(matches!(harness.run().0, Err(FaceBlurError::Decode { .. })));
    }

    #[test]
    fn test_write_failure_is_encode_error() {
        let mut harness = Harness::new(Ok(vec![]));
        harness.writer_fails = true;
        assert!(matches!(harness.run().0, Err(FaceBlurError::Encode { .. })));
    }

    #[test]
    fn test_detection_failure_obscures_whole_frame_by_default() {
        let (result, written) = Harness::new(Err("model crashed".into())).run();
        assert_eq!(result.unwrap(), 1);
        assert_eq!(marked_pixels(&written.lock().unwrap()[0].1), 16);
    }

    #[test]
    fn test_detection_failure_pass_through() {
        let mut harness = Harness::new(Err("model crashed".into()));
        harness.policy = DetectionFailurePolicy::PassThrough;
        let (result, written) = harness.run();
        assert_eq!(result.unwrap(), 0);
        assert_eq!(marked_pixels(&written.lock().unwrap()[0].1), 0);
    }

    #[test]
    fn test_detection_failure_abort_writes_nothing() {
        let mut harness = Harness::new(Err("model crashed".into()));
        harness.policy = DetectionFailurePolicy::Abort;
        let (result, written) = harness.run();
        assert!(matches!(result, Err(FaceBlurError::Detection { .. })));
        assert!(written.lock().unwrap().is_empty());
    }
}
