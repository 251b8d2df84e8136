//! Input resolution: turn a user-supplied path, URL or byte buffer into a
//! [`SourceImage`].
//!
//! The image is read fully into memory once and shared behind an `Arc`, so
//! the session can hand the same bytes to every retry without copying and
//! can recognise a repeated selection of the very same image by pointer.
//! No format check happens here beyond sniffing the media type; whether the
//! bytes really are a bitmap is decided by the preparer, which reports
//! [`Shot2CodeError::Decode`].

use crate::error::Shot2CodeError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A screenshot as selected by the user: raw bytes plus declared media type.
///
/// Immutable and cheap to clone.
#[derive(Clone)]
pub struct SourceImage {
    bytes: Arc<[u8]>,
    media_type: Option<String>,
    name: Option<String>,
}

impl SourceImage {
    /// Wrap raw bytes. The media type is sniffed when not declared.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>, media_type: Option<&str>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        let media_type = media_type
            .map(str::to_string)
            .or_else(|| sniff_media_type(&bytes).map(str::to_string));
        Self {
            bytes: Arc::from(bytes),
            media_type,
            name: None,
        }
    }

    /// Attach a display name (file name or URL).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Declared or sniffed media type, e.g. `image/png`.
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// True when both values share one buffer, i.e. came from the same selection.
    pub fn same_source(&self, other: &SourceImage) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceImage")
            .field("len", &self.bytes.len())
            .field("media_type", &self.media_type)
            .field("name", &self.name)
            .finish()
    }
}

/// Guess the media type from magic bytes.
pub fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Guess the media type from a file extension.
fn media_type_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a [`SourceImage`].
///
/// URLs are downloaded with the given timeout; anything else is read as a
/// local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SourceImage, Shot2CodeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Shot2CodeError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Read a local image file.
pub async fn read_local(path: &Path) -> Result<SourceImage, Shot2CodeError> {
    let path: PathBuf = path.to_path_buf();
    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) => {
            return Err(match e.kind() {
                std::io::ErrorKind::NotFound => Shot2CodeError::FileNotFound { path },
                std::io::ErrorKind::PermissionDenied => Shot2CodeError::PermissionDenied { path },
                _ => Shot2CodeError::ReadFailed { path, source: e },
            });
        }
    };

    let declared = sniff_media_type(&bytes).or_else(|| media_type_from_extension(&path));
    debug!(
        "Read local image: {} ({} bytes, {:?})",
        path.display(),
        bytes.len(),
        declared
    );

    let image = SourceImage::from_bytes(bytes, declared);
    Ok(match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => image.with_name(name),
        None => image,
    })
}

/// Download an image over HTTP(S).
async fn download_url(url: &str, timeout_secs: u64) -> Result<SourceImage, Shot2CodeError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Shot2CodeError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Shot2CodeError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Shot2CodeError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Shot2CodeError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .filter(|v| v.starts_with("image/"));

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Shot2CodeError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());

    let declared = header_type.or_else(|| sniff_media_type(&bytes).map(str::to_string));
    Ok(SourceImage::from_bytes(bytes.to_vec(), declared.as_deref()).with_name(url))
}
