/// Default BlazeFace short-range model file name, looked up in the model cache.
pub const BLAZEFACE_MODEL_NAME: &str = "blaze_face_short_range.onnx";

/// Box blur kernel edge length, in pixels.
pub const DEFAULT_KERNEL_SIZE: usize = 200;

/// Largest accepted kernel edge length.
pub const MAX_KERNEL_SIZE: usize = 4096;

/// Frame rate of muxed output videos.
pub const DEFAULT_OUTPUT_FPS: f64 = 25.0;

pub const DEFAULT_OUTPUT_DIR: &str = "outputs";
pub const IMAGE_OUTPUT_SUBDIR: &str = "images";
pub const VIDEO_OUTPUT_SUBDIR: &str = "video";
pub const VIDEO_OUTPUT_EXTENSION: &str = "avi";

/// Display poll interval for the live window.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;

pub const DEFAULT_CAMERA_INDEX: u32 = 0;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
