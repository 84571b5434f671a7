use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file not found: {0}")]
    ExplicitPathMissing(PathBuf),
    #[error("model {name} not found in {searched} and no download URL configured")]
    NotFound { name: String, searched: String },
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where a detector model may come from.
#[derive(Clone, Debug, Default)]
pub struct ModelAsset {
    /// User-supplied model path. When set it must exist; no fallback is tried.
    pub explicit_path: Option<PathBuf>,
    /// File name looked up in the cache and bundled directories.
    pub name: String,
    /// Download source used when no local copy exists.
    pub url: Option<String>,
    /// Directory shipped alongside the binary.
    pub bundled_dir: Option<PathBuf>,
}

impl ModelAsset {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Resolve a model file, checking local locations before downloading.
///
/// Resolution order:
/// 1. Explicit path
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory
/// 4. Download from URL to cache
pub fn resolve(asset: &ModelAsset, progress: Option<ProgressFn>) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit_path(asset)? {
        return Ok(path);
    }
    resolve_in(asset, &model_cache_dir()?, progress)
}

fn explicit_path(asset: &ModelAsset) -> Result<Option<PathBuf>, ModelResolveError> {
    match &asset.explicit_path {
        Some(path) if path.is_file() => Ok(Some(path.clone())),
        Some(path) => Err(ModelResolveError::ExplicitPathMissing(path.clone())),
        None => Ok(None),
    }
}

fn resolve_in(
    asset: &ModelAsset,
    cache_dir: &Path,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    if let Some(path) = explicit_path(asset)? {
        return Ok(path);
    }

    let cached_path = cache_dir.join(&asset.name);
    if cached_path.is_file() {
        log::debug!("Using cached model {}", cached_path.display());
        return Ok(cached_path);
    }

    if let Some(dir) = &asset.bundled_dir {
        let bundled_path = dir.join(&asset.name);
        if bundled_path.is_file() {
            log::debug!("Using bundled model {}", bundled_path.display());
            return Ok(bundled_path);
        }
    }

    let Some(url) = &asset.url else {
        let mut searched = cache_dir.display().to_string();
        if let Some(dir) = &asset.bundled_dir {
            searched.push_str(&format!(", {}", dir.display()));
        }
        return Err(ModelResolveError::NotFound {
            name: asset.name.clone(),
            searched,
        });
    };

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {} from {url}", asset.name);
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory, `<cache>/faceblur/models`.
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    dirs::cache_dir()
        .map(|d| d.join("faceblur").join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| ModelResolveError::Write { path, source }
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;
    let mut buf = vec![0u8; 256 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(temp_path))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))?;
    Ok(())
}
