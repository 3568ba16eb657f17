use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model file does not exist: {0}")]
    MissingFile(PathBuf),
    #[error("model {0} not found locally and no download URL was given")]
    NotFound(String),
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

/// Where a model file should come from.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelSource {
    /// A file the user pointed at directly.
    File(PathBuf),
    /// A model looked up by name, downloaded from `url` if not cached.
    Named { name: String, url: Option<String> },
}

impl ModelSource {
    /// Interprets a CLI argument: `http(s)://` URLs become named downloads
    /// keyed by their last path segment, anything else is a file path.
    pub fn parse(arg: &str, fallback_name: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            let name = arg
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback_name);
            ModelSource::Named {
                name: name.to_string(),
                url: Some(arg.to_string()),
            }
        } else {
            ModelSource::File(PathBuf::from(arg))
        }
    }
}

/// Resolve a model file to a local path.
///
/// Resolution order for named models:
/// 1. User cache directory (platform-specific)
/// 2. Bundled directory (pre-packaged installs)
/// 3. Download from the URL into the cache
pub fn resolve(
    source: &ModelSource,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    match source {
        ModelSource::File(path) => {
            if path.is_file() {
                Ok(path.clone())
            } else {
                Err(ModelResolveError::MissingFile(path.clone()))
            }
        }
        ModelSource::Named { name, url } => {
            resolve_named(name, url.as_deref(), &model_cache_dir()?, bundled_dir, progress)
        }
    }
}

fn resolve_named(
    name: &str,
    url: Option<&str>,
    cache_dir: &Path,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(dir) = bundled_dir {
        let bundled_path = dir.join(name);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    let url = url.ok_or_else(|| ModelResolveError::NotFound(name.to_string()))?;
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Lipread/models/`
/// - Linux: `$XDG_CACHE_HOME/Lipread/models/` or `~/.cache/Lipread/models/`
/// - Windows: `%LOCALAPPDATA%/Lipread/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("Lipread").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("Lipread").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let download_err = |e| ModelResolveError::Download {
        url: url.to_string(),
        source: e,
    };
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;

    let total = response.content_length().unwrap_or(0);
    let bytes = response.bytes().map_err(download_err)?;

    // Write beside the destination, then rename so a crash never leaves a truncated model.
    let temp_path = dest.with_extension("part");
    let write_err = |e| ModelResolveError::Write {
        path: temp_path.clone(),
        source: e,
    };
    let mut file = fs::File::create(&temp_path).map_err(write_err)?;

    let mut downloaded: u64 = 0;
    for chunk in bytes.chunks(1024 * 1024) {
        file.write_all(chunk).map_err(write_err)?;
        downloaded += chunk.len() as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}
