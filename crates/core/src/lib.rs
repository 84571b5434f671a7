//! Face blurring for still images, video files and live camera streams.
//!
//! Face localization is delegated to a [`detection::domain::face_detector::FaceDetector`];
//! this crate feeds frames to it in the calling convention of the current
//! [`detection::domain::operating_mode::OperatingMode`], box-blurs every
//! reported region and writes the result to disk or a display surface.

pub mod blurring;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod video;
