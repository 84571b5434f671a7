use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for the external face detection model.
///
/// A black box: given an image, returns one box per face. Implementations
/// may keep scratch state between calls, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
