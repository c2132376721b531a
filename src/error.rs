//! Error types for the fine-appeal library.
//!
//! Every failure in the pipeline is an [`AppealError`]. Each variant belongs
//! to exactly one [`ErrorKind`], which is what callers (the CLI, the HTTP
//! service, a UI) branch on to decide how to present the failure:
//!
//! * **Configuration** — the inference provider is not set up. Fatal, never
//!   retried.
//! * **Validation** — the input was rejected before any processing began.
//! * **Extraction** — the file was accepted but no content could be derived.
//! * **Inference** — the external AI call failed, timed out or returned nothing.
//! * **Parse** — the AI answered, but not with the structure that was asked for.
//! * **Output** — the appeal could not be serialised or written to disk.
//!
//! No stage substitutes default data for a failure: if an `Err` is returned,
//! nothing partial was produced.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the fine-appeal library.
#[derive(Debug, Error)]
pub enum AppealError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Validation errors ─────────────────────────────────────────────────
    /// Declared MIME type is not one of PDF, JPEG or PNG.
    #[error("Unsupported file type '{mime_type}'. Upload a PDF, JPEG or PNG file.")]
    UnsupportedFileType { mime_type: String },

    /// Declared or actual size is above the configured ceiling.
    #[error("File is too large: {size} bytes (limit is {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    /// The upload contained no bytes.
    #[error("File is empty")]
    EmptyFile,

    /// Leading bytes do not match the declared type.
    #[error("File content does not match declared type '{mime_type}' (first bytes: {magic:02X?})")]
    ContentMismatch { mime_type: String, magic: Vec<u8> },

    /// A request lacked a field the operation needs.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Request body could not be read as the expected JSON shape.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Input path given to the CLI does not exist.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// PDF declares a security handler (`/Encrypt`), even a permissions-only one.
    #[error("PDF is encrypted or has restricted permissions, so its text cannot be read. Save or print it to an unrestricted PDF and upload that copy.")]
    EncryptedPdf,

    /// PDF structure could not be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF parsed but contains no text layer.
    #[error("PDF contains no extractable text. Upload a photo of the fine instead.")]
    NoExtractableText,

    /// Image bytes could not be decoded.
    #[error("Image could not be decoded: {detail}")]
    ImageDecodeFailed { detail: String },

    /// Resized image could not be re-encoded.
    #[error("Image could not be re-encoded: {detail}")]
    ImageEncodeFailed { detail: String },

    /// Extraction aborted for a reason not covered above.
    #[error("Content could not be extracted: {detail}")]
    ExtractionFailed { detail: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    // ── Inference errors ──────────────────────────────────────────────────
    /// The LLM API returned an error or the transport failed.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The LLM answered with no content.
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// The operation did not finish within the configured wall-clock limit.
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    // ── Parse errors ──────────────────────────────────────────────────────
    /// Response was not a JSON object of the expected shape.
    #[error("Could not parse fine data from the AI response: {detail}\nResponse began with: {excerpt:?}")]
    MalformedResponse { detail: String, excerpt: String },

    /// A field held something other than a plain extracted value.
    #[error("Field '{field}' in the AI response is not a valid value: {reason}")]
    InvalidField { field: String, reason: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The rendered pages could not be serialised as PDF.
    #[error("Failed to build export document: {0}")]
    ExportFailed(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse category of an [`AppealError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Validation,
    Extraction,
    Inference,
    Parse,
    Output,
}

impl ErrorKind {
    /// HTTP status the service responds with for this kind.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Configuration => 503,
            ErrorKind::Validation => 400,
            ErrorKind::Extraction => 422,
            ErrorKind::Inference => 502,
            ErrorKind::Parse | ErrorKind::Output => 500,
        }
    }
}

impl AppealError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppealError::ProviderNotConfigured { .. } | AppealError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            AppealError::UnsupportedFileType { .. }
            | AppealError::FileTooLarge { .. }
            | AppealError::EmptyFile
            | AppealError::ContentMismatch { .. }
            | AppealError::MissingField(_)
            | AppealError::InvalidRequest(_)
            | AppealError::FileNotFound { .. }
            | AppealError::InvalidInput { .. } => ErrorKind::Validation,
            AppealError::EncryptedPdf
            | AppealError::CorruptPdf { .. }
            | AppealError::NoExtractableText
            | AppealError::ImageDecodeFailed { .. }
            | AppealError::ImageEncodeFailed { .. }
            | AppealError::ExtractionFailed { .. }
            | AppealError::DownloadFailed { .. } => ErrorKind::Extraction,
            AppealError::LlmApiError { .. }
            | AppealError::EmptyResponse
            | AppealError::Timeout { .. } => ErrorKind::Inference,
            AppealError::MalformedResponse { .. } | AppealError::InvalidField { .. } => {
                ErrorKind::Parse
            }
            AppealError::ExportFailed(_)
            | AppealError::OutputWriteFailed { .. }
            | AppealError::Internal(_) => ErrorKind::Output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_too_large_display() {
        let e = AppealError::FileTooLarge {
            size: 12_000_000,
            limit: 10_485_760,
        };
        let msg = e.to_string();
        assert!(msg.contains("12000000"), "got: {msg}");
        assert!(msg.contains("10485760"), "got: {msg}");
    }

    #[test]
    fn content_mismatch_shows_magic_bytes() {
        let e = AppealError::ContentMismatch {
            mime_type: "application/pdf".into(),
            magic: vec![0x89, 0x50],
        };
        assert!(e.to_string().contains("89"), "got: {e}");
    }

    #[test]
    fn timeout_display() {
        let e = AppealError::Timeout { secs: 60 };
        assert!(e.to_string().contains("60s"));
    }

    #[test]
    fn kinds_cover_taxonomy() {
        assert_eq!(
            AppealError::ProviderNotConfigured {
                provider: "auto".into(),
                hint: String::new()
            }
            .kind(),
            ErrorKind::Configuration
        );
        assert_eq!(AppealError::EmptyFile.kind(), ErrorKind::Validation);
        assert_eq!(AppealError::NoExtractableText.kind(), ErrorKind::Extraction);
        assert_eq!(AppealError::EmptyResponse.kind(), ErrorKind::Inference);
        assert_eq!(
            AppealError::MalformedResponse {
                detail: "x".into(),
                excerpt: "y".into()
            }
            .kind(),
            ErrorKind::Parse
        );
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(ErrorKind::Configuration.http_status(), 503);
        assert_eq!(ErrorKind::Validation.http_status(), 400);
        assert_eq!(ErrorKind::Parse.http_status(), 500);
    }
}
