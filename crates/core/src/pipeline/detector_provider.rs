use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::error::FaceBlurError;

/// Builds a fresh detector for each run.
///
/// A run owns its detector exclusively; in live mode it is moved onto the
/// detection worker thread.
pub trait DetectorProvider: Send + Sync {
    fn create(&self) -> Result<Box<dyn FaceDetector>, FaceBlurError>;
}
