use std::path::PathBuf;
use std::sync::Mutex;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::model_resolver::{self, ModelAsset};
use crate::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use crate::pipeline::detector_provider::DetectorProvider;
use crate::shared::constants::BLAZEFACE_MODEL_NAME;
use crate::shared::error::FaceBlurError;

/// BlazeFace short-range asset, with a `models/` directory next to the
/// running binary as the bundled location.
pub fn blazeface_asset(explicit_path: Option<PathBuf>, url: Option<String>) -> ModelAsset {
    let bundled_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")));
    ModelAsset {
        explicit_path,
        url,
        bundled_dir,
        ..ModelAsset::named(BLAZEFACE_MODEL_NAME)
    }
}

/// Loads a BlazeFace ONNX session per run.
///
/// The model file is resolved (and downloaded if needed) on first use; later
/// runs reuse the resolved path.
pub struct BlazefaceDetectorProvider {
    asset: ModelAsset,
    confidence: f64,
    resolved: Mutex<Option<PathBuf>>,
}

impl BlazefaceDetectorProvider {
    pub fn new(asset: ModelAsset, confidence: f64) -> Self {
        Self {
            asset,
            confidence,
            resolved: Mutex::new(None),
        }
    }

    fn model_path(&self) -> Result<PathBuf, FaceBlurError> {
        let mut resolved = self.resolved.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(path) = resolved.as_ref() {
            return Ok(path.clone());
        }

        let progress: model_resolver::ProgressFn = Box::new(|done, total| {
            if total > 0 {
                log::debug!("Model download: {done}/{total} bytes");
            }
        });
        let path = model_resolver::resolve(&self.asset, Some(progress)).map_err(|e| {
            let shown = self
                .asset
                .explicit_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(&self.asset.name));
            FaceBlurError::asset_load(shown, e)
        })?;
        *resolved = Some(path.clone());
        Ok(path)
    }
}

impl DetectorProvider for BlazefaceDetectorProvider {
    fn create(&self) -> Result<Box<dyn FaceDetector>, FaceBlurError> {
        let path = self.model_path()?;
        let detector = OnnxBlazefaceDetector::new(&path, self.confidence)
            .map_err(|e| FaceBlurError::asset_load(&path, e))?;
        Ok(Box::new(detector))
    }
}
