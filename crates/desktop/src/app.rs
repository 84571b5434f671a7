use std::time::Duration;

use iced::widget::{button, column, container, image, pick_list, row, slider, text};
use iced::{Element, Length, Subscription, Task};

use faceblur_core::shared::config::DetectionFailurePolicy;

use crate::settings::Settings;
use crate::workers::live_worker::{self, LiveSession, WorkerMessage};

const CAMERA_CHOICES: &[u32] = &[0, 1, 2, 3];

#[derive(Debug, Clone)]
pub enum Message {
    Start,
    Stop,
    Tick,
    CameraSelected(u32),
    KernelSizeChanged(u32),
    ConfidenceChanged(u32),
    OnDetectionErrorChanged(DetectionFailurePolicy),
}

pub struct App {
    pub settings: Settings,
    session: Option<LiveSession>,
    frame: Option<image::Handle>,
    frames_shown: usize,
    status: String,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        (
            Self {
                settings: Settings::load(),
                session: None,
                frame: None,
                frames_shown: 0,
                status: "Idle".to_string(),
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Start => {
                if self.session.is_none() {
                    self.frames_shown = 0;
                    self.status = format!("Opening camera {}", self.settings.camera_index);
                    self.session = Some(live_worker::spawn(self.settings.clone()));
                }
            }
            Message::Stop => {
                if let Some(session) = &self.session {
                    session.stop();
                    self.status = "Stopping".to_string();
                }
            }
            Message::Tick => self.drain_worker(),
            Message::CameraSelected(index) => {
                self.settings.camera_index = index;
                self.settings.save();
            }
            Message::KernelSizeChanged(size) => {
                self.settings.kernel_size = size.max(1);
                self.settings.save();
            }
            Message::ConfidenceChanged(val) => {
                self.settings.confidence = val;
                self.settings.save();
            }
            Message::OnDetectionErrorChanged(policy) => {
                self.settings.on_detection_error = policy;
                self.settings.save();
            }
        }
        Task::none()
    }

    /// Pulls everything the worker produced since the last tick and keeps
    /// the newest frame.
    fn drain_worker(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let mut finished = false;
        let mut latest = None;
        for message in session.messages.try_iter() {
            match message {
                WorkerMessage::Frame(frame) => {
                    self.frames_shown += 1;
                    latest = Some(frame);
                }
                WorkerMessage::Finished(summary) => {
                    self.status = format!(
                        "Stopped after {} frames ({} detection failures)",
                        summary.frames_rendered, summary.detection_failures
                    );
                    finished = true;
                }
                WorkerMessage::Error(e) => {
                    self.status = format!("Error: {e}");
                    finished = true;
                }
            }
        }
        if let Some(frame) = latest {
            self.frame = Some(image::Handle::from_rgba(frame.width, frame.height, frame.rgba));
            if !finished {
                self.status = format!("Live: {} frames", self.frames_shown);
            }
        }
        if finished {
            self.session = None;
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let running = self.session.is_some();
        let settings = &self.settings;

        let controls = row![
            pick_list(CAMERA_CHOICES, Some(settings.camera_index), Message::CameraSelected),
            pick_list(
                DetectionFailurePolicy::ALL,
                Some(settings.on_detection_error),
                Message::OnDetectionErrorChanged
            ),
            if running {
                button(text("Stop")).on_press(Message::Stop)
            } else {
                button(text("Start")).on_press(Message::Start)
            },
        ]
        .spacing(12);

        let tuning = row![
            text(format!("Blur {}px", settings.kernel_size)).width(90.0),
            slider(1..=400, settings.kernel_size, Message::KernelSizeChanged),
            text(format!("Confidence {}%", settings.confidence)).width(120.0),
            slider(5..=95, settings.confidence, Message::ConfidenceChanged).step(5u32),
        ]
        .spacing(8);

        let preview: Element<'_, Message> = match &self.frame {
            Some(handle) => image(handle.clone())
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => container(text("No camera feed"))
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
        };

        column![controls, tuning, preview, text(&self.status).size(12)]
            .spacing(10)
            .padding(12)
            .height(Length::Fill)
            .into()
    }

    pub fn subscription(&self) -> Subscription<Message> {
        if self.session.is_some() {
            iced::time::every(Duration::from_millis(self.settings.poll_interval_ms.max(1)))
                .map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }
}
