use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, TrySendError};

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::latest_detection_slot::LiveDetection;
use crate::detection::domain::operating_mode::OperatingMode;
use crate::shared::bounding_box::DetectionResult;
use crate::shared::error::FaceBlurError;
use crate::shared::frame::Frame;

/// Receives live-stream results on the detection worker thread.
pub type ResultCallback = Box<dyn Fn(LiveDetection) + Send + 'static>;

/// Drives a [`FaceDetector`] through the calling convention of one
/// [`OperatingMode`], fixed at construction.
///
/// - `SingleImage`: [`DetectorRunner::detect`]
/// - `Video`: [`DetectorRunner::detect_for_video`], timestamps non-decreasing
/// - `LiveStream`: [`DetectorRunner::detect_async`], results go to the
///   callback registered at construction, invoked on a worker thread owned
///   by the runner
pub struct DetectorRunner {
    mode: OperatingMode,
    last_timestamp_ms: Option<i64>,
    backend: Backend,
}

enum Backend {
    Inline(Box<dyn FaceDetector>),
    Worker(LiveWorker),
}

struct LiveWorker {
    submit_tx: Option<Sender<(Frame, i64)>>,
    handle: Option<JoinHandle<()>>,
    /// Set while the worker waits for a frame.
    idle: Arc<AtomicBool>,
}

impl DetectorRunner {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        mode: OperatingMode,
        callback: Option<ResultCallback>,
    ) -> Result<Self, FaceBlurError> {
        let backend = match (mode, callback) {
            (OperatingMode::LiveStream, Some(callback)) => {
                Backend::Worker(LiveWorker::spawn(detector, callback))
            }
            (OperatingMode::LiveStream, None) => {
                return Err(FaceBlurError::InvalidConfig(
                    "live-stream mode requires a result callback".to_string(),
                ));
            }
            (_, Some(_)) => {
                return Err(FaceBlurError::InvalidConfig(format!(
                    "a result callback is only valid in live-stream mode, not {mode}"
                )));
            }
            (_, None) => Backend::Inline(detector),
        };
        log::debug!("Detector configured for {mode} mode");
        Ok(Self {
            mode,
            last_timestamp_ms: None,
            backend,
        })
    }

    /// Synchronous detection on a still image.
    pub fn detect(&mut self, frame: &Frame) -> Result<DetectionResult, FaceBlurError> {
        self.require_mode(OperatingMode::SingleImage)?;
        self.run_inline(frame, 0)
    }

    /// Synchronous detection on one decoded video frame.
    pub fn detect_for_video(
        &mut self,
        frame: &Frame,
        timestamp_ms: i64,
    ) -> Result<DetectionResult, FaceBlurError> {
        self.require_mode(OperatingMode::Video)?;
        self.advance_timestamp(timestamp_ms)?;
        self.run_inline(frame, timestamp_ms)
    }

    /// Hands a copy of `frame` to the detection worker.
    ///
    /// Returns `Ok(false)` when the worker is still busy with an earlier
    /// frame; the submission is then skipped, never queued, and the frame is
    /// not copied. A worker that has died surfaces as a `Detection` error on
    /// every call.
    pub fn detect_async(&mut self, frame: &Frame, timestamp_ms: i64) -> Result<bool, FaceBlurError> {
        self.require_mode(OperatingMode::LiveStream)?;
        self.advance_timestamp(timestamp_ms)?;
        let stopped = || FaceBlurError::detection(frame.index(), "detection worker has stopped");
        let Backend::Worker(worker) = &self.backend else {
            return Err(stopped());
        };
        let Some(tx) = worker.submit_tx.as_ref() else {
            return Err(stopped());
        };
        if worker.is_finished() {
            return Err(stopped());
        }
        if !worker.idle.load(Ordering::Acquire) {
            return Ok(false);
        }
        match tx.try_send((frame.clone(), timestamp_ms)) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Disconnected(_)) => Err(stopped()),
        }
    }

    /// Stops the live worker (if any) and waits for it to finish.
    pub fn close(&mut self) {
        if let Backend::Worker(worker) = &mut self.backend {
            worker.shutdown();
        }
    }

    fn require_mode(&self, requested: OperatingMode) -> Result<(), FaceBlurError> {
        if self.mode == requested {
            Ok(())
        } else {
            Err(FaceBlurError::ModeMismatch {
                requested,
                configured: self.mode,
            })
        }
    }

    fn advance_timestamp(&mut self, timestamp_ms: i64) -> Result<(), FaceBlurError> {
        if let Some(previous_ms) = self.last_timestamp_ms {
            if timestamp_ms < previous_ms {
                return Err(FaceBlurError::NonMonotonicTimestamp {
                    timestamp_ms,
                    previous_ms,
                });
            }
        }
        self.last_timestamp_ms = Some(timestamp_ms);
        Ok(())
    }

    fn run_inline(
        &mut self,
        frame: &Frame,
        timestamp_ms: i64,
    ) -> Result<DetectionResult, FaceBlurError> {
        let Backend::Inline(detector) = &mut self.backend else {
            unreachable!("synchronous modes always run inline");
        };
        let boxes = detector
            .detect(frame)
            .map_err(|e| FaceBlurError::detection(frame.index(), e))?;
        Ok(DetectionResult::new(boxes, timestamp_ms))
    }
}

impl Drop for DetectorRunner {
    fn drop(&mut self) {
        self.close();
    }
}

impl LiveWorker {
    fn spawn(mut detector: Box<dyn FaceDetector>, callback: ResultCallback) -> Self {
        // Zero capacity: a send only succeeds while the worker is idle in recv.
        let (submit_tx, submit_rx) = crossbeam_channel::bounded::<(Frame, i64)>(0);
        let idle = Arc::new(AtomicBool::new(true));
        let worker_idle = idle.clone();
        let handle = std::thread::spawn(move || {
            loop {
                worker_idle.store(true, Ordering::Release);
                let Ok((frame, timestamp_ms)) = submit_rx.recv() else {
                    break;
                };
                worker_idle.store(false, Ordering::Release);
                let outcome = detector.detect(&frame).map_err(|e| e.to_string());
                if let Err(ref message) = outcome {
                    log::warn!("Live detection failed on frame {}: {message}", frame.index());
                }
                callback(LiveDetection {
                    frame_index: frame.index(),
                    timestamp_ms,
                    outcome,
                });
            }
            log::debug!("Detection worker stopped");
        });
        Self {
            submit_tx: Some(submit_tx),
            handle: Some(handle),
            idle,
        }
    }

    fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    fn shutdown(&mut self) {
        self.submit_tx = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Detection worker panicked");
            }
        }
    }
}
