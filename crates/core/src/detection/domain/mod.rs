pub mod detector_runner;
pub mod face_detector;
pub mod latest_detection_slot;
pub mod operating_mode;
