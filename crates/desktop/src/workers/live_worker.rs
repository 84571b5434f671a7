use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use faceblur_core::pipeline::blur_live_use_case::LiveSummary;
use faceblur_core::pipeline::infrastructure::blazeface_detector_provider::{
    blazeface_asset, BlazefaceDetectorProvider,
};
use faceblur_core::pipeline::infrastructure::ffmpeg_media_backend::FfmpegMediaBackend;
use faceblur_core::pipeline::orchestrator::FrameBlurringOrchestrator;
use faceblur_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use faceblur_core::shared::frame::Frame;
use faceblur_core::video::domain::frame_display::{DisplayControl, FrameDisplay};

use crate::settings::Settings;

/// Frames in flight between the capture thread and the window.
const FRAME_QUEUE_DEPTH: usize = 2;

/// RGBA pixels ready for an `iced` image handle.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Messages sent from the worker thread to the UI.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Frame(RenderedFrame),
    Finished(LiveSummary),
    Error(String),
}

/// Handle to a running live session.
pub struct LiveSession {
    pub messages: Receiver<WorkerMessage>,
    stop: Arc<AtomicBool>,
}

impl LiveSession {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Forwards rendered frames to the UI and reports when it should stop.
struct ChannelDisplay {
    tx: Sender<WorkerMessage>,
    stop: Arc<AtomicBool>,
}

impl FrameDisplay for ChannelDisplay {
    fn show(&mut self, frame: &Frame) -> Result<DisplayControl, Box<dyn std::error::Error>> {
        if self.stop.load(Ordering::Relaxed) {
            return Ok(DisplayControl::Stop);
        }
        let rendered = RenderedFrame {
            width: frame.width(),
            height: frame.height(),
            rgba: to_rgba(frame)?,
        };
        // A dropped receiver means the window is gone.
        match self.tx.send(WorkerMessage::Frame(rendered)) {
            Ok(()) => Ok(DisplayControl::Continue),
            Err(_) => Ok(DisplayControl::Stop),
        }
    }
}

fn to_rgba(frame: &Frame) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    match frame.channels() {
        3 => Ok(frame
            .data()
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect()),
        4 => Ok(frame.data().to_vec()),
        n => Err(format!("cannot display a frame with {n} channels").into()),
    }
}

/// Spawn the capture/blur loop on a background thread.
pub fn spawn(settings: Settings) -> LiveSession {
    let (tx, rx) = crossbeam_channel::bounded::<WorkerMessage>(FRAME_QUEUE_DEPTH);
    let stop = Arc::new(AtomicBool::new(false));
    let stop_worker = stop.clone();

    thread::spawn(move || {
        let message = match run_live(&settings, tx.clone(), stop_worker) {
            Ok(summary) => WorkerMessage::Finished(summary),
            Err(e) => {
                log::error!("Live session failed: {e}");
                WorkerMessage::Error(e.to_string())
            }
        };
        let _ = tx.send(message);
    });

    LiveSession { messages: rx, stop }
}

fn run_live(
    settings: &Settings,
    tx: Sender<WorkerMessage>,
    stop: Arc<AtomicBool>,
) -> Result<LiveSummary, Box<dyn std::error::Error>> {
    let config = settings.to_config();
    let provider = BlazefaceDetectorProvider::new(
        blazeface_asset(settings.model_path.clone(), settings.model_url.clone()),
        config.confidence,
    );
    let orchestrator =
        FrameBlurringOrchestrator::new(config, Box::new(FfmpegMediaBackend), Box::new(provider))?
            .with_logger_factory(Box::new(|| Box::new(StdoutPipelineLogger::default())));

    log::info!("Starting live session on camera {}", settings.camera_index);
    let summary = orchestrator.blur_live(Box::new(ChannelDisplay { tx, stop }))?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_frame() -> Frame {
        Frame::new(vec![10, 20, 30, 40, 50, 60], 2, 1, 3, 0)
    }

    fn display() -> (ChannelDisplay, Receiver<WorkerMessage>, Arc<AtomicBool>) {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let stop = Arc::new(AtomicBool::new(false));
        (
            ChannelDisplay {
                tx,
                stop: stop.clone(),
            },
            rx,
            stop,
        )
    }

    #[test]
    fn test_show_forwards_rgba_frame() {
        let (mut display, rx, _stop) = display();
        assert_eq!(display.show(&rgb_frame()).unwrap(), DisplayControl::Continue);

        match rx.try_recv().unwrap() {
            WorkerMessage::Frame(f) => {
                assert_eq!((f.width, f.height), (2, 1));
                assert_eq!(f.rgba, vec![10, 20, 30, 255, 40, 50, 60, 255]);
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_stop_flag_ends_session_without_sending() {
        let (mut display, rx, stop) = display();
        stop.store(true, Ordering::Relaxed);
        assert_eq!(display.show(&rgb_frame()).unwrap(), DisplayControl::Stop);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_window_stops_session() {
        let (mut display, rx, _stop) = display();
        drop(rx);
        assert_eq!(display.show(&rgb_frame()).unwrap(), DisplayControl::Stop);
    }

    #[test]
    fn test_single_channel_frame_rejected() {
        let frame = Frame::new(vec![0; 4], 2, 2, 1, 0);
        assert!(to_rgba(&frame).is_err());
    }

    #[test]
    fn test_dropping_session_sets_stop() {
        let (_tx, rx) = crossbeam_channel::bounded(1);
        let stop = Arc::new(AtomicBool::new(false));
        drop(LiveSession {
            messages: rx,
            stop: stop.clone(),
        });
        assert!(stop.load(Ordering::Relaxed));
    }
}
