/// Axis-aligned face rectangle reported by a detector, in pixel coordinates.
///
/// Detectors may report boxes that extend past the frame edges (or lie
/// entirely outside it), so coordinates are signed and unchecked. Call
/// [`BoundingBox::clamp_to`] before indexing pixel data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box covering a whole `width × height` frame.
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    /// Intersection with a `frame_width × frame_height` frame.
    ///
    /// Returns `None` when the intersection is empty. Uses 64-bit arithmetic
    /// so extreme detector output cannot overflow.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<BoundingBox> {
        if self.is_empty() {
            return None;
        }
        let x1 = (self.x as i64).max(0);
        let y1 = (self.y as i64).max(0);
        let x2 = (self.x as i64 + self.width as i64).min(frame_width as i64);
        let y2 = (self.y as i64 + self.height as i64).min(frame_height as i64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(BoundingBox::new(
            x1 as i32,
            y1 as i32,
            (x2 - x1) as i32,
            (y2 - y1) as i32,
        ))
    }

    /// Whether the pixel `(px, py)` lies inside this box.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x
            && py >= self.y
            && (px as i64) < self.x as i64 + self.width as i64
            && (py as i64) < self.y as i64 + self.height as i64
    }
}

/// All boxes a detector reported for one frame.
///
/// Order is detector-defined and irrelevant downstream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub boxes: Vec<BoundingBox>,
    pub timestamp_ms: i64,
}

impl DetectionResult {
    pub fn new(boxes: Vec<BoundingBox>, timestamp_ms: i64) -> Self {
        Self {
            boxes,
            timestamp_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}
