use std::cell::RefCell;

use crate::blurring::domain::frame_blurrer::FrameBlurrer;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::DEFAULT_KERNEL_SIZE;
use crate::shared::frame::Frame;

use super::box_filter::{self, RoiRect};

/// CPU blurrer that replaces each boxed region with a box-filtered copy.
///
/// Each box is clamped to the frame first; the blur of a region only reads
/// pixels inside that (clamped) region.
pub struct CpuBoxBlurrer {
    kernel_size: usize,
    roi_buf: RefCell<Vec<u8>>,
    sum_buf: RefCell<Vec<u64>>,
}

impl CpuBoxBlurrer {
    pub fn new(kernel_size: usize) -> Self {
        Self {
            kernel_size: kernel_size.max(1),
            roi_buf: RefCell::new(Vec::new()),
            sum_buf: RefCell::new(Vec::new()),
        }
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }
}

impl Default for CpuBoxBlurrer {
    fn default() -> Self {
        Self::new(DEFAULT_KERNEL_SIZE)
    }
}

impl FrameBlurrer for CpuBoxBlurrer {
    fn blur(
        &self,
        frame: &mut Frame,
        boxes: &[BoundingBox],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (fw, fh) = (frame.width(), frame.height());
        let channels = frame.channels() as usize;
        let data = frame.data_mut();

        let mut roi = self.roi_buf.borrow_mut();
        let mut sums = self.sum_buf.borrow_mut();

        for b in boxes {
            let Some(clamped) = b.clamp_to(fw, fh) else {
                log::debug!("Skipping box {b:?} outside {fw}x{fh} frame");
                continue;
            };
            let rect = RoiRect {
                x: clamped.x as usize,
                y: clamped.y as usize,
                w: clamped.width as usize,
                h: clamped.height as usize,
            };

            box_filter::extract_roi(data, fw as usize, channels, rect, &mut roi);
            box_filter::box_blur_with_temp(
                &mut roi,
                rect.w,
                rect.h,
                channels,
                self.kernel_size,
                &mut sums,
            );
            box_filter::write_roi_back(data, &roi, fw as usize, channels, rect);
        }

        Ok(())
    }
}
