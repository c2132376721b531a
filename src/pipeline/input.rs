//! Input resolution: turn a local path or URL into an [`UploadedFile`].
//!
//! The HTTP service receives uploads directly; the CLI receives a path or an
//! HTTP(S) URL and needs to produce the same [`UploadedFile`] a browser upload
//! would. The MIME type is taken from the file extension (local files) or the
//! `Content-Type` header, falling back to the URL extension (downloads).
//! Only the size ceiling is enforced here, so an oversized file is never read
//! into memory; everything else is [`crate::pipeline::validate`]'s job.

use crate::config::AppealConfig;
use crate::error::AppealError;
use crate::model::{FileKind, UploadedFile};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// MIME type used when nothing better is known. Always fails validation.
const UNKNOWN_MIME: &str = "application/octet-stream";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory upload.
///
/// Downloads use `config.download_timeout_secs`; local files and downloads
/// above `config.max_upload_bytes` are rejected without being buffered.
pub async fn resolve_input(input: &str, config: &AppealConfig) -> Result<UploadedFile, AppealError> {
    if input.trim().is_empty() {
        return Err(AppealError::InvalidInput {
            input: input.to_string(),
        });
    }
    let limit = config.max_upload_bytes;
    if is_url(input) {
        download_url(input, config.download_timeout_secs, limit).await
    } else {
        read_local(Path::new(input), limit).await
    }
}

fn check_size(size: u64, limit: u64) -> Result<(), AppealError> {
    if size > limit {
        Err(AppealError::FileTooLarge { size, limit })
    } else {
        Ok(())
    }
}

/// MIME type implied by a path's extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(FileKind::from_extension)
        .map(FileKind::mime_type)
        .unwrap_or(UNKNOWN_MIME)
}

async fn read_local(path: &Path, limit: u64) -> Result<UploadedFile, AppealError> {
    let io_error = |e: std::io::Error| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            AppealError::FileNotFound {
                path: path.to_path_buf(),
            }
        }
        _ => AppealError::Internal(format!("Failed to read {}: {}", path.display(), e)),
    };
    let meta = tokio::fs::metadata(path).await.map_err(io_error)?;
    check_size(meta.len(), limit)?;
    let bytes = tokio::fs::read(path).await.map_err(io_error)?;

    debug!("Read local file: {} ({} bytes)", path.display(), bytes.len());

    let mut file = UploadedFile::new(bytes, mime_for_path(path));
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        file = file.with_file_name(name);
    }
    Ok(file)
}

/// Download a URL into memory, giving up once the body passes `limit`.
async fn download_url(url: &str, timeout_secs: u64, limit: u64) -> Result<UploadedFile, AppealError> {
    info!("Downloading fine document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AppealError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let mut response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppealError::DownloadFailed {
            url: url.to_string(),
            reason: if e.is_timeout() {
                format!("timed out after {timeout_secs}s")
            } else {
                e.to_string()
            },
        })?;

    if !response.status().is_success() {
        return Err(AppealError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let file_name = filename_from_url(url);
    let header_mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|v| FileKind::from_mime(v).is_some())
        .map(str::to_string);
    let mime = header_mime.unwrap_or_else(|| {
        file_name
            .as_deref()
            .map(|n| mime_for_path(Path::new(n)).to_string())
            .unwrap_or_else(|| UNKNOWN_MIME.to_string())
    });

    if let Some(declared) = response.content_length() {
        check_size(declared, limit)?;
    }

    let mut bytes = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppealError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
    {
        bytes.extend_from_slice(&chunk);
        check_size(bytes.len() as u64, limit)?;
    }

    info!("Downloaded {} bytes ({})", bytes.len(), mime);

    let mut file = UploadedFile::new(bytes, mime);
    if let Some(name) = file_name {
        file = file.with_file_name(name);
    }
    Ok(file)
}

/// Last path segment of a URL, if it looks like a file name.
fn filename_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    if !last.is_empty() && last.contains('.') {
        Some(last.to_string())
    } else {
        None
    }
}

/// Path of the JSON file next to `input` with the given suffix.
pub fn sibling_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("fine");
    input.with_file_name(format!("{stem}{suffix}"))
}
