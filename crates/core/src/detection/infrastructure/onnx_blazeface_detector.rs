//! BlazeFace short-range face detector running on ONNX Runtime via `ort`.
//!
//! Produces plain bounding boxes: no tracking, no landmarks. Boxes are
//! reported in frame coordinates and may extend past the frame edges.
use std::path::Path;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

use super::execution_provider::preferred_execution_providers;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: box (4) + 6 keypoints (12).
const REGRESSOR_STRIDE: usize = 16;

pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    /// Loads a BlazeFace ONNX model from `model_path`.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        if !model_path.is_file() {
            return Err(format!("model file not found: {}", model_path.display()).into());
        }
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        log::info!(
            "Loaded BlazeFace model from {} (confidence >= {confidence})",
            model_path.display()
        );
        Ok(Self {
            session,
            confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }

        let input_tensor = preprocess(frame, INPUT_SIZE);
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        let mut raw_dets = decode_detections(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence as f32,
            frame.width(),
            frame.height(),
        );
        let kept = nms(&mut raw_dets, NMS_IOU_THRESH);

        Ok(kept.iter().map(RawDet::to_bounding_box).collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize frame to `size × size` (nearest neighbour) and normalize to [0,1] NCHW float32.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

// ---------------------------------------------------------------------------
// Anchors and decoding
// ---------------------------------------------------------------------------

/// Short-range anchors: a 16×16 grid with 2 anchors per cell followed by an
/// 8×8 grid with 6 anchors per cell, centres in normalized coordinates.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

#[derive(Clone, Debug, PartialEq)]
struct RawDet {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    score: f64,
}

impl RawDet {
    fn to_bounding_box(&self) -> BoundingBox {
        let x = self.x1.round() as i32;
        let y = self.y1.round() as i32;
        BoundingBox::new(
            x,
            y,
            (self.x2.round() as i32).saturating_sub(x),
            (self.y2.round() as i32).saturating_sub(y),
        )
    }
}

/// Turns raw model outputs into scored boxes in frame pixel coordinates.
fn decode_detections(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    frame_width: u32,
    frame_height: u32,
) -> Vec<RawDet> {
    let (fw, fh) = (frame_width as f32, frame_height as f32);
    let input = INPUT_SIZE as f32;
    let mut dets = Vec::new();

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }
        let offset = i * REGRESSOR_STRIDE;
        if offset + 4 > reg_data.len() {
            break;
        }

        let anchor = anchors[i];
        let cx = anchor[0] + reg_data[offset] / input;
        let cy = anchor[1] + reg_data[offset + 1] / input;
        let w = reg_data[offset + 2] / input;
        let h = reg_data[offset + 3] / input;

        dets.push(RawDet {
            x1: ((cx - w / 2.0) * fw) as f64,
            y1: ((cy - h / 2.0) * fh) as f64,
            x2: ((cx + w / 2.0) * fw) as f64,
            y2: ((cy + h / 2.0) * fh) as f64,
            score: score as f64,
        });
    }

    dets
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

fn nms(dets: &mut [RawDet], iou_thresh: f64) -> Vec<RawDet> {
    dets.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if !suppressed[j] && bbox_iou(&dets[i], &dets[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &RawDet, b: &RawDet) -> f64 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    inter / (area_a + area_b - inter)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
