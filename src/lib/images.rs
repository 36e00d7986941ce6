//! Image loading for report figures.
//!
//! Figures come from local files (resolved against a base directory, usually
//! the manifest's folder), from the report's plot scratch directory, or from
//! HTTP(S) URLs when the `fetch` feature is enabled. Loaded bytes are cached
//! per renderer so an image used twice is read once.

use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Image formats the layout engine can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Svg,
    WebP,
    Gif,
}

impl ImageFormat {
    /// Detects the format from the file extension.
    ///
    /// ```
    /// use predictables_report::images::ImageFormat;
    /// assert_eq!(ImageFormat::from_path("photo.JPG"), Some(ImageFormat::Jpeg));
    /// assert_eq!(ImageFormat::from_path("temp_plot_1.svg"), Some(ImageFormat::Svg));
    /// assert_eq!(ImageFormat::from_path("notes.txt"), None);
    /// ```
    pub fn from_path(path: &str) -> Option<ImageFormat> {
        let lower = path.to_lowercase();
        if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            Some(ImageFormat::Jpeg)
        } else if lower.ends_with(".png") {
            Some(ImageFormat::Png)
        } else if lower.ends_with(".svg") {
            Some(ImageFormat::Svg)
        } else if lower.ends_with(".webp") {
            Some(ImageFormat::WebP)
        } else if lower.ends_with(".gif") {
            Some(ImageFormat::Gif)
        } else {
            None
        }
    }

    /// Detects the format from leading magic bytes.
    pub fn from_bytes(bytes: &[u8]) -> Option<ImageFormat> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageFormat::WebP)
        } else {
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
            let head = head.trim_start();
            (head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")))
                .then_some(ImageFormat::Svg)
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Svg => "image/svg+xml",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Gif => "image/gif",
        }
    }
}

/// Error types for image operations.
#[derive(Debug)]
pub enum ImageError {
    /// Failed to load image from local filesystem
    LoadError(String),
    /// Failed to download image from remote URL
    DownloadError(String),
    /// Neither the extension nor the content identifies a supported format
    UnsupportedFormat(String),
}

impl std::fmt::Display for ImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageError::LoadError(e) => write!(f, "Failed to load image: {}", e),
            ImageError::DownloadError(e) => write!(f, "Failed to download image: {}", e),
            ImageError::UnsupportedFormat(e) => write!(f, "Unsupported image format: {}", e),
        }
    }
}

impl std::error::Error for ImageError {}

/// Loaded image bytes with their detected format.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    /// Path or URL as given by the caller
    pub source: String,
}

/// Loads and caches images for one rendering pass.
pub struct ImageLoader {
    base_dir: Option<PathBuf>,
    cache: HashMap<String, ImageData>,
    allow_remote: bool,
}

impl ImageLoader {
    /// Creates a loader resolving relative paths against `base_dir`.
    pub fn new(base_dir: Option<&Path>) -> Self {
        ImageLoader {
            base_dir: base_dir.map(Path::to_path_buf),
            cache: HashMap::new(),
            allow_remote: true,
        }
    }

    pub fn set_allow_remote(&mut self, allow: bool) {
        self.allow_remote = allow;
    }

    fn is_remote(url_or_path: &str) -> bool {
        url_or_path.starts_with("http://") || url_or_path.starts_with("https://")
    }

    /// Resolves a relative path against the base directory. URLs and
    /// absolute paths pass through unchanged.
    pub fn resolve_path(&self, url_or_path: &str) -> PathBuf {
        let path = Path::new(url_or_path);
        match &self.base_dir {
            Some(base) if !Self::is_remote(url_or_path) && path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Loads an image, consulting the cache first.
    pub fn load(&mut self, url_or_path: &str) -> Result<ImageData, ImageError> {
        if let Some(data) = self.cache.get(url_or_path) {
            return Ok(data.clone());
        }

        let bytes = if Self::is_remote(url_or_path) {
            if !self.allow_remote {
                return Err(ImageError::DownloadError(
                    "Remote images are disabled".to_string(),
                ));
            }
            load_remote(url_or_path)?
        } else {
            let resolved = self.resolve_path(url_or_path);
            debug!("Loading image from {}", resolved.display());
            std::fs::read(&resolved).map_err(|e| {
                ImageError::LoadError(format!("Failed to read file {}: {}", resolved.display(), e))
            })?
        };

        let format = ImageFormat::from_path(url_or_path)
            .or_else(|| ImageFormat::from_bytes(&bytes))
            .ok_or_else(|| ImageError::UnsupportedFormat(url_or_path.to_string()))?;

        let image_data = ImageData {
            bytes,
            format,
            source: url_or_path.to_string(),
        };
        self.cache.insert(url_or_path.to_string(), image_data.clone());
        Ok(image_data)
    }
}

#[cfg(feature = "fetch")]
fn load_remote(url: &str) -> Result<Vec<u8>, ImageError> {
    let client = reqwest::blocking::Client::new();
    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| ImageError::DownloadError(format!("Failed to download {}: {}", url, e)))?;

    response
        .bytes()
        .map(|b| b.to_vec())
        .map_err(|e| ImageError::DownloadError(format!("Failed to read response: {}", e)))
}

#[cfg(not(feature = "fetch"))]
fn load_remote(url: &str) -> Result<Vec<u8>, ImageError> {
    log::warn!("Skipping remote image {}", url);
    Err(ImageError::DownloadError(format!(
        "Remote image loading from {} requires the 'fetch' feature",
        url
    )))
}
