use crate::shared::bounding_box::BoundingBox;
use crate::shared::config::DetectionFailurePolicy;
use crate::shared::error::FaceBlurError;
use crate::shared::frame::Frame;

/// Regions to blur on `frame` after its detection failed with `error`.
///
/// `Abort` hands the error back; the other policies log and continue.
pub fn regions_after_failure(
    policy: DetectionFailurePolicy,
    frame: &Frame,
    error: FaceBlurError,
) -> Result<Vec<BoundingBox>, FaceBlurError> {
    match policy {
        DetectionFailurePolicy::Obscure => log::warn!("{error}; obscuring the whole frame"),
        DetectionFailurePolicy::PassThrough => {
            log::warn!("{error}; leaving frame {} unblurred", frame.index())
        }
        DetectionFailurePolicy::Abort => {}
    }
    fallback_regions(policy, frame, error)
}

/// Same outcome as [`regions_after_failure`] without logging, for failures
/// that were already reported.
pub fn fallback_regions(
    policy: DetectionFailurePolicy,
    frame: &Frame,
    error: FaceBlurError,
) -> Result<Vec<BoundingBox>, FaceBlurError> {
    match policy {
        DetectionFailurePolicy::Obscure => {
            Ok(vec![BoundingBox::full_frame(frame.width(), frame.height())])
        }
        DetectionFailurePolicy::PassThrough => Ok(Vec::new()),
        DetectionFailurePolicy::Abort => Err(error),
    }
}
