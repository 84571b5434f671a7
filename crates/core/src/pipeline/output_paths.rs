//! Where each entry operation stores its result.
//!
//! - images: `<root>/images/<input file name>`
//! - videos: `<root>/video/<input file name up to the first '.'>.avi`
use std::path::{Path, PathBuf};

use crate::shared::constants::{IMAGE_OUTPUT_SUBDIR, VIDEO_OUTPUT_EXTENSION, VIDEO_OUTPUT_SUBDIR};
use crate::shared::error::FaceBlurError;

pub fn image_output_path(output_root: &Path, input: &Path) -> Result<PathBuf, FaceBlurError> {
    let name = input
        .file_name()
        .ok_or_else(|| FaceBlurError::decode(input.display().to_string(), "path has no file name"))?;
    Ok(output_root.join(IMAGE_OUTPUT_SUBDIR).join(name))
}

pub fn video_output_path(output_root: &Path, input: &Path) -> Result<PathBuf, FaceBlurError> {
    let name = input
        .file_name()
        .ok_or_else(|| FaceBlurError::decode(input.display().to_string(), "path has no file name"))?
        .to_string_lossy();

    let stem = match name.split('.').next() {
        Some(head) if !head.is_empty() => head.to_string(),
        // Dot-files: ".clip.mp4" → ".clip"
        _ => input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "output".to_string()),
    };

    Ok(output_root
        .join(VIDEO_OUTPUT_SUBDIR)
        .join(format!("{stem}.{VIDEO_OUTPUT_EXTENSION}")))
}
