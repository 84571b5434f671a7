use std::path::Path;
use std::time::Instant;

use crate::blurring::domain::frame_blurrer::FrameBlurrer;
use crate::detection::domain::detector_runner::DetectorRunner;
use crate::pipeline::detection_fallback::regions_after_failure;
use crate::pipeline::pipeline_logger::{elapsed_ms, PipelineLogger};
use crate::shared::config::DetectionFailurePolicy;
use crate::shared::error::FaceBlurError;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{VideoReader, VideoSource};
use crate::video::domain::video_writer::VideoWriter;

/// Video blurring pipeline.
///
/// Every frame is decoded, detected with its presentation timestamp,
/// blurred and kept in memory; once the input is exhausted the frames are
/// muxed at a fixed output rate. Output dimensions come from the first
/// frame.
pub struct BlurVideoUseCase {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    runner: DetectorRunner,
    blurrer: Box<dyn FrameBlurrer>,
    failure_policy: DetectionFailurePolicy,
    output_fps: f64,
    logger: Box<dyn PipelineLogger>,
}

impl BlurVideoUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        runner: DetectorRunner,
        blurrer: Box<dyn FrameBlurrer>,
        failure_policy: DetectionFailurePolicy,
        output_fps: f64,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            writer,
            runner,
            blurrer,
            failure_policy,
            output_fps,
            logger,
        }
    }

    /// Blurs `input_path` into `output_path`. Returns the number of frames
    /// written, which always equals the number decoded.
    pub fn execute(&mut self, input_path: &Path, output_path: &Path) -> Result<usize, FaceBlurError> {
        let input = input_path.display().to_string();
        let metadata = self
            .reader
            .open(&VideoSource::File(input_path.to_path_buf()))
            .map_err(|e| FaceBlurError::decode(&input, e))?;
        self.logger.info(&format!(
            "Blurring {input}: {}x{}, {} frames @ {:.2} fps",
            metadata.width, metadata.height, metadata.total_frames, metadata.fps
        ));

        let processed = self.process_frames(&input, &metadata);
        self.reader.close();
        let processed = processed?;

        let Some(first) = processed.first() else {
            return Err(FaceBlurError::encode(output_path, "input produced no frames"));
        };
        let out_meta = VideoMetadata::for_output(
            first.width(),
            first.height(),
            self.output_fps,
            processed.len(),
        );

        let t = Instant::now();
        self.write_all(output_path, &out_meta, &processed)
            .map_err(|e| FaceBlurError::encode(output_path, e))?;
        self.logger.timing("encode", elapsed_ms(t));

        self.logger.info(&format!(
            "Wrote {} frames to {}",
            processed.len(),
            output_path.display()
        ));
        self.logger.summary();
        Ok(processed.len())
    }

    fn process_frames(
        &mut self,
        input: &str,
        metadata: &VideoMetadata,
    ) -> Result<Vec<Frame>, FaceBlurError> {
        let total = metadata.total_frames;
        let mut processed = Vec::with_capacity(total);
        let mut last_timestamp_ms: Option<i64> = None;

        let mut t = Instant::now();
        for item in self.reader.frames() {
            let mut frame = item.map_err(|e| FaceBlurError::decode(input, e))?;
            self.logger.timing("decode", elapsed_ms(t));

            let timestamp_ms = presentation_timestamp(&frame, metadata, last_timestamp_ms);
            last_timestamp_ms = Some(timestamp_ms);

            let t_detect = Instant::now();
            let regions = match self.runner.detect_for_video(&frame, timestamp_ms) {
                Ok(result) => result.boxes,
                Err(e @ FaceBlurError::Detection { .. }) => {
                    regions_after_failure(self.failure_policy, &frame, e)?
                }
                Err(e) => return Err(e),
            };
            self.logger.timing("detect", elapsed_ms(t_detect));
            self.logger.metric("faces", regions.len() as f64);

            let t_blur = Instant::now();
            self.blurrer
                .blur(&mut frame, &regions)
                .map_err(|e| FaceBlurError::blur(frame.index(), e))?;
            self.logger.timing("blur", elapsed_ms(t_blur));

            processed.push(frame);
            self.logger.progress(processed.len(), total);
            t = Instant::now();
        }

        Ok(processed)
    }

    fn write_all(
        &mut self,
        output_path: &Path,
        metadata: &VideoMetadata,
        frames: &[Frame],
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.writer.open(output_path, metadata)?;
        let written: Result<(), Box<dyn std::error::Error>> =
            frames.iter().try_for_each(|frame| self.writer.write(frame));
        let closed = self.writer.close();
        written?;
        closed
    }
}

/// Timestamp handed to the detector for `frame`: the decoder's value when
/// present, else derived from the index and source rate, and never earlier
/// than the previous frame's.
fn presentation_timestamp(frame: &Frame, metadata: &VideoMetadata, previous: Option<i64>) -> i64 {
    let raw = frame
        .timestamp_ms()
        .or_else(|| metadata.timestamp_for_index(frame.index()))
        .unwrap_or(frame.index() as i64);
    previous.map_or(raw, |p| raw.max(p))
}
