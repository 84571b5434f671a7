use std::fmt;
use std::time::Instant;

use crate::blurring::domain::frame_blurrer::FrameBlurrer;
use crate::detection::domain::detector_runner::DetectorRunner;
use crate::detection::domain::latest_detection_slot::LatestDetectionSlot;
use crate::pipeline::detection_fallback::{fallback_regions, regions_after_failure};
use crate::pipeline::pipeline_logger::{elapsed_ms, PipelineLogger};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::config::DetectionFailurePolicy;
use crate::shared::error::FaceBlurError;
use crate::shared::frame::Frame;
use crate::video::domain::frame_display::{DisplayControl, FrameDisplay};
use crate::video::domain::video_reader::{VideoReader, VideoSource};

/// Phases of the capture/render loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveState {
    Idle,
    Capturing,
    Submitted,
    ResultReady,
    Rendering,
    Finished,
}

impl fmt::Display for LiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Why the live loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiveStopReason {
    EndOfStream,
    DisplayClosed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiveSummary {
    pub frames_rendered: usize,
    /// Frames the detection worker accepted.
    pub frames_submitted: usize,
    /// Frames rendered with at least one detection result available.
    pub frames_with_result: usize,
    /// Distinct failed detections observed by the render loop.
    pub detection_failures: usize,
    pub stop_reason: LiveStopReason,
}

/// Live camera pipeline.
///
/// Capture and rendering run on the caller's thread; detection runs on the
/// runner's worker. Each frame is blurred with the most recent completed
/// detection, which may belong to an earlier frame. Until the first result
/// arrives frames are rendered unblurred.
pub struct BlurLiveUseCase {
    reader: Box<dyn VideoReader>,
    display: Box<dyn FrameDisplay>,
    runner: DetectorRunner,
    slot: LatestDetectionSlot,
    blurrer: Box<dyn FrameBlurrer>,
    failure_policy: DetectionFailurePolicy,
    logger: Box<dyn PipelineLogger>,
    state: LiveState,
}

impl BlurLiveUseCase {
    /// `runner` must be in live-stream mode with a callback that publishes
    /// into `slot`.
    pub fn new(
        reader: Box<dyn VideoReader>,
        display: Box<dyn FrameDisplay>,
        runner: DetectorRunner,
        slot: LatestDetectionSlot,
        blurrer: Box<dyn FrameBlurrer>,
        failure_policy: DetectionFailurePolicy,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            display,
            runner,
            slot,
            blurrer,
            failure_policy,
            logger,
            state: LiveState::Idle,
        }
    }

    pub fn state(&self) -> LiveState {
        self.state
    }

    pub fn execute(&mut self, source: &VideoSource) -> Result<LiveSummary, FaceBlurError> {
        let result = self.run_loop(source);
        self.runner.close();
        self.reader.close();
        transition(&mut self.state, LiveState::Finished);
        let summary = result?;
        self.logger.info(&format!(
            "Live session ended ({:?}): {} frames rendered, {} submitted, {} failed detections",
            summary.stop_reason,
            summary.frames_rendered,
            summary.frames_submitted,
            summary.detection_failures
        ));
        self.logger.summary();
        Ok(summary)
    }

    fn run_loop(&mut self, source: &VideoSource) -> Result<LiveSummary, FaceBlurError> {
        let input = source.to_string();
        self.reader
            .open(source)
            .map_err(|e| FaceBlurError::decode(&input, e))?;

        let mut summary = LiveSummary {
            frames_rendered: 0,
            frames_submitted: 0,
            frames_with_result: 0,
            detection_failures: 0,
            stop_reason: LiveStopReason::EndOfStream,
        };
        let clock = Instant::now();
        let mut last_timestamp_ms: i64 = 0;
        let mut last_failure_seq: Option<u64> = None;
        let mut worker_lost = false;

        let mut frames = self.reader.frames();
        loop {
            transition(&mut self.state, LiveState::Capturing);
            let t = Instant::now();
            let Some(item) = frames.next() else {
                break;
            };
            let mut frame = item.map_err(|e| FaceBlurError::decode(&input, e))?;
            self.logger.timing("decode", elapsed_ms(t));

            let timestamp_ms = (clock.elapsed().as_millis() as i64).max(last_timestamp_ms);
            last_timestamp_ms = timestamp_ms;

            let worker_failure = match self.runner.detect_async(&frame, timestamp_ms) {
                Ok(accepted) => {
                    if accepted {
                        summary.frames_submitted += 1;
                    }
                    None
                }
                Err(e @ FaceBlurError::Detection { .. }) => Some(e),
                Err(e) => return Err(e),
            };
            transition(&mut self.state, LiveState::Submitted);

            let regions = if let Some(error) = worker_failure {
                // No further results can arrive; never fall back to stale boxes.
                if !worker_lost {
                    worker_lost = true;
                    summary.detection_failures += 1;
                    regions_after_failure(self.failure_policy, &frame, error)?
                } else {
                    fallback_regions(self.failure_policy, &frame, error)?
                }
            } else {
                match self.slot.latest() {
                    None => Vec::new(),
                    Some((seq, detection)) => {
                        transition(&mut self.state, LiveState::ResultReady);
                        summary.frames_with_result += 1;
                        self.logger
                            .metric("result_lag_ms", (timestamp_ms - detection.timestamp_ms) as f64);
                        match detection.outcome {
                            Ok(boxes) => boxes,
                            Err(message) => {
                                let error = FaceBlurError::detection(detection.frame_index, message);
                                if last_failure_seq != Some(seq) {
                                    last_failure_seq = Some(seq);
                                    summary.detection_failures += 1;
                                    regions_after_failure(self.failure_policy, &frame, error)?
                                } else {
                                    fallback_regions(self.failure_policy, &frame, error)?
                                }
                            }
                        }
                    }
                }
            };

            transition(&mut self.state, LiveState::Rendering);
            let control = render(
                self.blurrer.as_ref(),
                self.display.as_mut(),
                self.logger.as_mut(),
                &mut frame,
                &regions,
            )?;
            summary.frames_rendered += 1;
            self.logger.progress(summary.frames_rendered, 0);

            if control == DisplayControl::Stop {
                summary.stop_reason = LiveStopReason::DisplayClosed;
                break;
            }
        }

        Ok(summary)
    }
}

fn render(
    blurrer: &dyn FrameBlurrer,
    display: &mut dyn FrameDisplay,
    logger: &mut dyn PipelineLogger,
    frame: &mut Frame,
    regions: &[BoundingBox],
) -> Result<DisplayControl, FaceBlurError> {
    let t = Instant::now();
    blurrer
        .blur(frame, regions)
        .map_err(|e| FaceBlurError::blur(frame.index(), e))?;
    logger.timing("blur", elapsed_ms(t));

    let t = Instant::now();
    let control = display
        .show(frame)
        .map_err(|e| FaceBlurError::Display(e.to_string()))?;
    logger.timing("render", elapsed_ms(t));
    Ok(control)
}

fn transition(state: &mut LiveState, next: LiveState) {
    if *state != next {
        log::trace!("live: {state} -> {next}");
        *state = next;
    }
}
