//! Content extraction: validated upload → [`ExtractedContent`].
//!
//! Two paths, chosen by [`FileKind`]:
//!
//! * **PDF** — read the text layer with `pdf-extract`. Digitally issued fines
//!   (e-mailed PDFs, portal downloads) carry a full text layer; sending text
//!   instead of a picture is cheaper and more accurate.
//! * **JPEG / PNG** — transcode with [`crate::pipeline::encode`] and let the
//!   vision model read it.
//!
//! Extraction is CPU-bound and synchronous; the composer runs it on the
//! blocking thread pool so the async workers never stall on a large file.

use crate::config::AppealConfig;
use crate::error::AppealError;
use crate::model::{ExtractedContent, FileKind, UploadedFile};
use crate::pipeline::encode::transcode_image;
use tracing::{debug, info, warn};

/// Turns a validated upload into inference-ready content.
///
/// Implemented by [`FileContentExtractor`]; tests substitute spies.
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, file: &UploadedFile, kind: FileKind) -> Result<ExtractedContent, AppealError>;
}

/// Default extractor: pdf-extract for documents, image transcoding for photos.
#[derive(Debug, Clone)]
pub struct FileContentExtractor {
    max_image_dimension: u32,
    jpeg_quality: u8,
    max_text_chars: usize,
}

impl Default for FileContentExtractor {
    fn default() -> Self {
        Self::from_config(&AppealConfig::default())
    }
}

impl FileContentExtractor {
    pub fn from_config(config: &AppealConfig) -> Self {
        Self {
            max_image_dimension: config.max_image_dimension,
            jpeg_quality: config.jpeg_quality,
            max_text_chars: config.max_text_chars,
        }
    }

    fn extract_pdf(&self, bytes: &[u8]) -> Result<ExtractedContent, AppealError> {
        // lopdf gives a clean corrupt/encrypted distinction; pdf-extract
        // only reports a flat error string.
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| classify_pdf_error(&e.to_string()))?;
        if doc.is_encrypted() {
            return Err(AppealError::EncryptedPdf);
        }
        let page_count = doc.get_pages().len();

        let raw = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| classify_pdf_error(&e.to_string()))?;

        let text = normalise_text(&raw);
        if text.is_empty() {
            return Err(AppealError::NoExtractableText);
        }

        let text = truncate_chars(text, self.max_text_chars);
        info!(
            "Extracted {} chars of text from {}-page PDF",
            text.chars().count(),
            page_count
        );
        Ok(ExtractedContent::Text(text))
    }
}

impl ContentExtractor for FileContentExtractor {
    fn extract(&self, file: &UploadedFile, kind: FileKind) -> Result<ExtractedContent, AppealError> {
        match kind {
            FileKind::Pdf => self.extract_pdf(&file.bytes),
            FileKind::Jpeg | FileKind::Png => {
                let payload = transcode_image(
                    &file.bytes,
                    kind,
                    self.max_image_dimension,
                    self.jpeg_quality,
                )?;
                info!(
                    "Prepared {}x{} image ({} bytes) for inference",
                    payload.width,
                    payload.height,
                    payload.data.len()
                );
                Ok(ExtractedContent::Image(payload))
            }
        }
    }
}

/// Map a PDF library error message onto the extraction taxonomy.
fn classify_pdf_error(message: &str) -> AppealError {
    let lower = message.to_lowercase();
    if lower.contains("encrypt") || lower.contains("password") || lower.contains("decrypt") {
        AppealError::EncryptedPdf
    } else {
        AppealError::CorruptPdf {
            detail: message.to_string(),
        }
    }
}

/// Collapse runs of spaces, drop form feeds and blank-line runs.
fn normalise_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;
    for line in raw.lines() {
        let line = line.replace('\u{0C}', " ");
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(&collapsed);
        out.push('\n');
    }
    out.trim().to_string()
}

/// Keep at most `max` characters, cutting on a char boundary.
fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => {
            warn!(
                "Document text truncated to {} chars (was {})",
                max,
                text.chars().count()
            );
            text[..byte_idx].to_string()
        }
        None => {
            debug!("Document text within budget");
            text
        }
    }
}
