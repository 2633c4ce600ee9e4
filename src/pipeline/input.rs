//! Input resolution: turn user-supplied strings into [`UploadedImage`]s.
//!
//! Three input forms are accepted:
//!
//! * a local file path, read fully into memory;
//! * an HTTP/HTTPS URL, downloaded with the configured timeout;
//! * a `data:<mime>;base64,<payload>` URI, decoded in place.
//!
//! No size or type validation happens here. The media type is *declared*
//! from the best available evidence (data-URI header, `Content-Type`, magic
//! bytes, file extension) and passed through as-is, even when it is not an
//! image type.

use crate::error::SolverError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::try_join_all;
use image::ImageFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Media type used when nothing better can be determined.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Raw binary payload plus its declared media type.
///
/// Owned by the encoding step and dropped once encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Display name for logs and errors (file name, URL or `data-uri`).
    pub name: String,
    /// Declared media type, e.g. `image/png`.
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedImage")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl UploadedImage {
    /// Wrap bytes with an explicitly declared media type.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Wrap bytes, declaring the media type by sniffing them.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let media_type = sniff_media_type(&bytes, &name);
        Self {
            name,
            media_type,
            bytes,
        }
    }

    /// Read a local file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SolverError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SolverError::ReadFailed {
                name: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::from_bytes(name, bytes))
    }
}

/// Declare a media type for `bytes`: magic bytes first, then the extension
/// of `name_hint`, then [`FALLBACK_MEDIA_TYPE`].
pub fn sniff_media_type(bytes: &[u8], name_hint: &str) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    Path::new(name_hint)
        .extension()
        .and_then(ImageFormat::from_extension)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string())
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Check if the input string is a `data:` URI.
pub fn is_data_uri(input: &str) -> bool {
    input.starts_with("data:")
}

static RE_DATA_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^data:(?P<mime>[^;,]*)(?P<params>(?:;[^;,]*)*),(?P<payload>.*)$").unwrap()
});

/// Split a `data:` URI into `(media_type, base64_payload)`.
///
/// Returns `None` when `input` is not a base64 data URI. The payload has its
/// header removed but is otherwise untouched.
pub fn split_data_uri(input: &str) -> Option<(&str, &str)> {
    let caps = RE_DATA_URI.captures(input)?;
    let params = caps.name("params").map_or("", |m| m.as_str());
    if !params.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        return None;
    }
    let mime = caps.name("mime").map_or("", |m| m.as_str());
    let payload = caps.name("payload").map_or("", |m| m.as_str());
    Some((mime, payload))
}

/// Resolve one input string to an in-memory image.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<UploadedImage, SolverError> {
    if is_data_uri(input) {
        decode_data_uri(input)
    } else if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        UploadedImage::from_path(input).await
    }
}

/// Resolve every input concurrently. The output keeps the input order; the
/// first failure fails the whole batch.
pub async fn resolve_inputs<S: AsRef<str>>(
    inputs: &[S],
    timeout_secs: u64,
) -> Result<Vec<UploadedImage>, SolverError> {
    try_join_all(
        inputs
            .iter()
            .map(|input| resolve_input(input.as_ref(), timeout_secs)),
    )
    .await
}

/// Decode a base64 `data:` URI.
fn decode_data_uri(input: &str) -> Result<UploadedImage, SolverError> {
    let invalid = |reason: &str| SolverError::InvalidInput {
        input: truncate_for_display(input),
        reason: reason.to_string(),
    };

    let (mime, payload) = split_data_uri(input).ok_or_else(|| invalid("not a base64 data URI"))?;
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| invalid(&format!("bad base64 payload: {e}")))?;

    let media_type = if mime.is_empty() {
        sniff_media_type(&bytes, "")
    } else {
        mime.to_string()
    };
    Ok(UploadedImage::new("data-uri", media_type, bytes))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedImage, SolverError> {
    info!("Downloading image from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SolverError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SolverError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SolverError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(SolverError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let declared = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_string())
        .filter(|v| v.starts_with("image/"));

    let filename = extract_filename(url);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| SolverError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    info!("Downloaded {} ({} bytes)", filename, bytes.len());

    let media_type = declared.unwrap_or_else(|| sniff_media_type(&bytes, &filename));
    Ok(UploadedImage::new(filename, media_type, bytes))
}

/// Extract a reasonable filename from the URL.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded-image".to_string()
}

fn truncate_for_display(input: &str) -> String {
    const MAX: usize = 48;
    match input.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}\u{2026}", &input[..idx]),
        None => input.to_string(),
    }
}
