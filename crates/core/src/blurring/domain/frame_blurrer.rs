use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for smoothing the pixels under a set of boxes.
///
/// Implementations modify the frame in-place (`&mut Frame`) and must clamp
/// every box to the frame before touching pixel data.
pub trait FrameBlurrer: Send {
    fn blur(&self, frame: &mut Frame, boxes: &[BoundingBox])
        -> Result<(), Box<dyn std::error::Error>>;
}
