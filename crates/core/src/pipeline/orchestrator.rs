use std::path::{Path, PathBuf};

use crate::blurring::domain::frame_blurrer::FrameBlurrer;
use crate::blurring::infrastructure::cpu_box_blurrer::CpuBoxBlurrer;
use crate::detection::domain::detector_runner::DetectorRunner;
use crate::detection::domain::latest_detection_slot::LatestDetectionSlot;
use crate::detection::domain::operating_mode::OperatingMode;
use crate::pipeline::blur_image_use_case::BlurImageUseCase;
use crate::pipeline::blur_live_use_case::{BlurLiveUseCase, LiveSummary};
use crate::pipeline::blur_video_use_case::BlurVideoUseCase;
use crate::pipeline::detector_provider::DetectorProvider;
use crate::pipeline::media_backend::MediaBackend;
use crate::pipeline::output_paths::{image_output_path, video_output_path};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::config::BlurConfig;
use crate::shared::error::FaceBlurError;
use crate::shared::frame::Frame;
use crate::video::domain::frame_display::FrameDisplay;
use crate::video::domain::video_reader::VideoSource;

/// Builds a fresh logger for each run.
pub type LoggerFactory = Box<dyn Fn() -> Box<dyn PipelineLogger> + Send + Sync>;

/// Entry point for the three blurring operations.
///
/// Each call creates its own detector in the matching operating mode and
/// releases it before returning, whatever the outcome.
pub struct FrameBlurringOrchestrator {
    config: BlurConfig,
    media: Box<dyn MediaBackend>,
    detectors: Box<dyn DetectorProvider>,
    logger_factory: LoggerFactory,
}

impl FrameBlurringOrchestrator {
    pub fn new(
        config: BlurConfig,
        media: Box<dyn MediaBackend>,
        detectors: Box<dyn DetectorProvider>,
    ) -> Result<Self, FaceBlurError> {
        config.validate()?;
        Ok(Self {
            config,
            media,
            detectors,
            logger_factory: Box::new(|| Box::new(NullPipelineLogger)),
        })
    }

    pub fn with_logger_factory(mut self, factory: LoggerFactory) -> Self {
        self.logger_factory = factory;
        self
    }

    pub fn config(&self) -> &BlurConfig {
        &self.config
    }

    /// Blurs every face in a still image and writes it to
    /// `<output_dir>/images/<file name>`. Returns the written path.
    pub fn blur_image(&self, input: &Path) -> Result<PathBuf, FaceBlurError> {
        require_file(input)?;
        let output = image_output_path(&self.config.output_dir, input)?;
        let runner = self.runner(OperatingMode::SingleImage)?;

        let mut use_case = BlurImageUseCase::new(
            self.media.image_reader(),
            self.media.image_writer(),
            runner,
            self.blurrer(),
            self.config.failure_policy,
            (self.logger_factory)(),
        );
        use_case.execute(input, &output)?;
        Ok(output)
    }

    /// Blurs every frame of a video file and writes an AVI to
    /// `<output_dir>/video/<stem>.avi` at the configured frame rate.
    pub fn blur_video(&self, input: &Path) -> Result<PathBuf, FaceBlurError> {
        require_file(input)?;
        let output = video_output_path(&self.config.output_dir, input)?;
        let runner = self.runner(OperatingMode::Video)?;

        let mut use_case = BlurVideoUseCase::new(
            self.media.video_reader(),
            self.media.video_writer(),
            runner,
            self.blurrer(),
            self.config.failure_policy,
            self.config.output_fps,
            (self.logger_factory)(),
        );
        use_case.execute(input, &output)?;
        Ok(output)
    }

    /// Captures from the configured camera and renders blurred frames to
    /// `display` until the stream ends or the display asks to stop.
    pub fn blur_live(&self, display: Box<dyn FrameDisplay>) -> Result<LiveSummary, FaceBlurError> {
        let slot = LatestDetectionSlot::new();
        let detector = self.detectors.create()?;
        let runner = DetectorRunner::new(detector, OperatingMode::LiveStream, Some(slot.publisher()))?;

        let mut use_case = BlurLiveUseCase::new(
            self.media.camera_reader(),
            display,
            runner,
            slot,
            self.blurrer(),
            self.config.failure_policy,
            (self.logger_factory)(),
        );
        use_case.execute(&VideoSource::Camera(self.config.camera_index))
    }

    /// Box-blurs `boxes` in place with the configured kernel. Boxes are
    /// clamped to the frame; empty ones are skipped.
    pub fn apply_blur_to_regions(
        &self,
        frame: &mut Frame,
        boxes: &[BoundingBox],
    ) -> Result<(), FaceBlurError> {
        let index = frame.index();
        self.blurrer()
            .blur(frame, boxes)
            .map_err(|e| FaceBlurError::blur(index, e))
    }

    fn runner(&self, mode: OperatingMode) -> Result<DetectorRunner, FaceBlurError> {
        DetectorRunner::new(self.detectors.create()?, mode, None)
    }

    fn blurrer(&self) -> Box<dyn FrameBlurrer> {
        Box::new(CpuBoxBlurrer::new(self.config.kernel_size))
    }
}

fn require_file(input: &Path) -> Result<(), FaceBlurError> {
    if input.is_file() {
        Ok(())
    } else {
        Err(FaceBlurError::decode(
            input.display().to_string(),
            "no such file",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::pipeline::infrastructure::ffmpeg_media_backend::FfmpegMediaBackend;
    use crate::shared::config::DetectionFailurePolicy;
    use crate::video::domain::frame_display::DisplayControl;
    use crate::video::domain::image_writer::ImageWriter;
    use crate::video::domain::video_reader::VideoReader;
    use crate::video::domain::video_writer::VideoWriter;
    use crate::video::infrastructure::ffmpeg_reader::tests::create_test_video;
    use crate::video::infrastructure::ffmpeg_reader::FfmpegReader;
    use crate::video::infrastructure::image_file_reader::ImageFileReader;
    use crate::video::infrastructure::image_file_writer::ImageFileWriter;
    use crate::shared::video_metadata::VideoMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    // --- Stubs ---

    struct FixedBoxes(Vec<BoundingBox>);

    impl FaceDetector for FixedBoxes {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(self.0.clone())
        }
    }

    struct StubProvider {
        boxes: Vec<BoundingBox>,
        fail: bool,
        created: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn returning(boxes: Vec<BoundingBox>) -> Self {
            Self {
                boxes,
                fail: false,
                created: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl DetectorProvider for StubProvider {
        fn create(&self) -> Result<Box<dyn FaceDetector>, FaceBlurError> {
            if self.fail {
                return Err(FaceBlurError::asset_load("face.onnx", "missing"));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FixedBoxes(self.boxes.clone())))
        }
    }

    /// Replays a fixed list of frames from any source.
    struct ScriptedReader {
        frames: Vec<Frame>,
        fps: f64,
    }

    impl VideoReader for ScriptedReader {
        fn open(&mut self, _source: &VideoSource) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            let (w, h) = self
                .frames
                .first()
                .map(|f| (f.width(), f.height()))
                .unwrap_or((4, 4));
            Ok(VideoMetadata::for_output(w, h, self.fps, self.frames.len()))
        }

        fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(std::mem::take(&mut self.frames).into_iter().map(Ok))
        }

        fn close(&mut self) {}
    }

    struct CountingWriter {
        written: Arc<AtomicUsize>,
    }

    impl VideoWriter for CountingWriter {
        fn open(&mut self, _path: &Path, _metadata: &VideoMetadata) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }

        fn write(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
    }

    /// Real image codecs, scripted video and camera.
    struct TestBackend {
        video_frames: Vec<Frame>,
        written: Arc<AtomicUsize>,
    }

    impl TestBackend {
        fn new(video_frames: Vec<Frame>) -> Self {
            Self {
                video_frames,
                written: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl MediaBackend for TestBackend {
        fn image_reader(&self) -> Box<dyn VideoReader> {
            Box::new(ImageFileReader::new())
        }

        fn video_reader(&self) -> Box<dyn VideoReader> {
            Box::new(ScriptedReader {
                frames: self.video_frames.clone(),
                fps: 30.0,
            })
        }

        fn camera_reader(&self) -> Box<dyn VideoReader> {
            self.video_reader()
        }

        fn image_writer(&self) -> Box<dyn ImageWriter> {
            Box::new(ImageFileWriter::new())
        }

        fn video_writer(&self) -> Box<dyn VideoWriter> {
            Box::new(CountingWriter {
                written: self.written.clone(),
            })
        }
    }

    struct CollectingDisplay {
        shown: Arc<AtomicUsize>,
    }

    impl FrameDisplay for CollectingDisplay {
        fn show(&mut self, _frame: &Frame) -> Result<DisplayControl, Box<dyn std::error::Error>> {
            self.shown.fetch_add(1, Ordering::SeqCst);
            Ok(DisplayControl::Continue)
        }
    }

    // --- Helpers ---

    fn config_in(dir: &Path) -> BlurConfig {
        BlurConfig {
            kernel_size: 5,
            output_dir: dir.join("outputs"),
            ..BlurConfig::default()
        }
    }

    fn orchestrator(dir: &Path, backend: TestBackend, provider: StubProvider) -> FrameBlurringOrchestrator {
        FrameBlurringOrchestrator::new(config_in(dir), Box::new(backend), Box::new(provider)).unwrap()
    }

    /// 32x32 vertical stripes, so any blur visibly changes pixels.
    fn striped_image() -> image::RgbImage {
        image::RgbImage::from_fn(32, 32, |x, _| {
            if x % 2 == 0 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        })
    }

    fn gray_frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::new(vec![100; 8 * 8 * 3], 8, 8, 3, i))
            .collect()
    }

    // --- Tests ---

    #[test]
    fn test_invalid_config_rejected() {
        let config = BlurConfig {
            kernel_size: 0,
            ..BlurConfig::default()
        };
        let result = FrameBlurringOrchestrator::new(
            config,
            Box::new(TestBackend::new(vec![])),
            Box::new(StubProvider::returning(vec![])),
        );
        assert!(matches!(result, Err(FaceBlurError::InvalidConfig(_))));
    }

    #[test]
    fn test_blur_image_missing_input_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = StubProvider::returning(vec![]);
        let created = provider.created.clone();
        let orch = orchestrator(dir.path(), TestBackend::new(vec![]), provider);

        let result = orch.blur_image(&dir.path().join("missing.png"));
        assert!(matches!(result, Err(FaceBlurError::Decode { .. })));
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_blur_image_black_image_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("black.png");
        image::RgbImage::new(16, 16).save(&input).unwrap();
        let orch = orchestrator(
            dir.path(),
            TestBackend::new(vec![]),
            StubProvider::returning(vec![BoundingBox::new(2, 2, 8, 8)]),
        );

        let output = orch.blur_image(&input).unwrap();
        assert_eq!(output, dir.path().join("outputs").join("images").join("black.png"));

        let written = image::open(&output).unwrap().to_rgb8();
        assert!(written.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_blur_image_changes_only_inside_box() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("stripes.png");
        let original = striped_image();
        original.save(&input).unwrap();
        let face = BoundingBox::new(8, 8, 12, 12);
        let orch = orchestrator(
            dir.path(),
            TestBackend::new(vec![]),
            StubProvider::returning(vec![face]),
        );

        let output = orch.blur_image(&input).unwrap();
        let written = image::open(&output).unwrap().to_rgb8();

        let mut changed_inside = 0;
        for (x, y, pixel) in written.enumerate_pixels() {
            let inside = face.contains(x as i32, y as i32);
            if inside {
                if pixel != original.get_pixel(x, y) {
                    changed_inside += 1;
                }
            } else {
                assert_eq!(pixel, original.get_pixel(x, y), "pixel ({x}, {y}) outside box changed");
            }
        }
        assert_eq!(changed_inside, 12 * 12);
    }

    #[test]
    fn test_blur_image_asset_failure_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("black.png");
        image::RgbImage::new(4, 4).save(&input).unwrap();
        let mut provider = StubProvider::returning(vec![]);
        provider.fail = true;
        let orch = orchestrator(dir.path(), TestBackend::new(vec![]), provider);

        assert!(matches!(
            orch.blur_image(&input),
            Err(FaceBlurError::AssetLoad { .. })
        ));
        assert!(!dir.path().join("outputs").join("images").join("black.png").exists());
    }

    #[test]
    fn test_blur_video_writes_every_frame() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.final.mp4");
        std::fs::write(&input, b"placeholder").unwrap();
        let backend = TestBackend::new(gray_frames(6));
        let written = backend.written.clone();
        let orch = orchestrator(dir.path(), backend, StubProvider::returning(vec![]));

        let output = orch.blur_video(&input).unwrap();
        assert_eq!(output, dir.path().join("outputs").join("video").join("clip.avi"));
        assert_eq!(written.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_blur_video_zero_frames_is_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.mp4");
        std::fs::write(&input, b"").unwrap();
        let backend = TestBackend::new(vec![]);
        let written = backend.written.clone();
        let orch = orchestrator(dir.path(), backend, StubProvider::returning(vec![]));

        assert!(matches!(orch.blur_video(&input), Err(FaceBlurError::Encode { .. })));
        assert_eq!(written.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_blur_live_renders_until_stream_ends() {
        let dir = tempfile::tempdir().unwrap();
        let shown = Arc::new(AtomicUsize::new(0));
        let orch = orchestrator(
            dir.path(),
            TestBackend::new(gray_frames(5)),
            StubProvider::returning(vec![]),
        );

        let summary = orch
            .blur_live(Box::new(CollectingDisplay { shown: shown.clone() }))
            .unwrap();
        assert_eq!(summary.frames_rendered, 5);
        assert_eq!(shown.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_each_operation_creates_its_own_detector() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        image::RgbImage::new(4, 4).save(&input).unwrap();
        let provider = StubProvider::returning(vec![]);
        let created = provider.created.clone();
        let orch = orchestrator(dir.path(), TestBackend::new(vec![]), provider);

        orch.blur_image(&input).unwrap();
        orch.blur_image(&input).unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_apply_blur_to_regions_ignores_outside_boxes() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(
            dir.path(),
            TestBackend::new(vec![]),
            StubProvider::returning(vec![]),
        );
        let mut frame = Frame::new(striped_image().into_raw(), 32, 32, 3, 0);
        let before = frame.clone();

        orch.apply_blur_to_regions(&mut frame, &[BoundingBox::new(100, 100, 10, 10)])
            .unwrap();
        assert_eq!(frame.data(), before.data());

        orch.apply_blur_to_regions(&mut frame, &[BoundingBox::new(-4, -4, 12, 12)])
            .unwrap();
        assert_ne!(frame.data(), before.data());
        assert_eq!(frame.pixel(20, 20), before.pixel(20, 20));
    }

    #[test]
    fn test_blur_video_end_to_end_with_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("source.mp4");
        create_test_video(&input, 5, 64, 48, 30);

        let config = BlurConfig {
            failure_policy: DetectionFailurePolicy::Abort,
            ..config_in(dir.path())
        };
        let orch = FrameBlurringOrchestrator::new(
            config,
            Box::new(FfmpegMediaBackend),
            Box::new(StubProvider::returning(vec![BoundingBox::new(10, 10, 20, 20)])),
        )
        .unwrap();

        let output = orch.blur_video(&input).unwrap();
        let mut reader = FfmpegReader::new();
        let meta = reader.open(&VideoSource::File(output)).unwrap();
        assert_eq!((meta.width, meta.height), (64, 48));
        assert!((meta.fps - 25.0).abs() < 0.5, "fps was {}", meta.fps);
        assert_eq!(reader.frames().count(), 5);
    }
}
