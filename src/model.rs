//! Data types flowing through the appeal pipeline.
//!
//! ```text
//! UploadedFile ──▶ ExtractedContent ──▶ FineRecord ──▶ AppealDocument
//!  (request)        (text | image)       (7 strings)     (text + ref metadata)
//! ```
//!
//! Everything here is plain data: owned, cloneable where cheap, and
//! (de)serialisable with the camelCase field names the HTTP contract uses.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Upload ───────────────────────────────────────────────────────────────

/// A file handed to the pipeline by a caller.
///
/// `declared_size` is what the client claimed; validation checks both it and
/// the real byte length.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub declared_size: u64,
    pub file_name: Option<String>,
}

impl UploadedFile {
    /// Wrap raw bytes, declaring their actual length as the size.
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        let declared_size = bytes.len() as u64;
        Self {
            bytes,
            mime_type: mime_type.into(),
            declared_size,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = size;
        self
    }
}

/// The three upload formats the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Jpeg,
    Png,
}

impl FileKind {
    /// Parse a MIME type, ignoring case and parameters (`; charset=...`).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(FileKind::Pdf),
            "image/jpeg" => Some(FileKind::Jpeg),
            "image/png" => Some(FileKind::Png),
            _ => None,
        }
    }

    /// Guess a MIME type from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileKind::Pdf),
            "jpg" | "jpeg" => Some(FileKind::Jpeg),
            "png" => Some(FileKind::Png),
            _ => None,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Jpeg => "image/jpeg",
            FileKind::Png => "image/png",
        }
    }

    /// Leading bytes every file of this kind starts with.
    pub fn magic(self) -> &'static [u8] {
        match self {
            FileKind::Pdf => b"%PDF",
            FileKind::Jpeg => &[0xFF, 0xD8, 0xFF],
            FileKind::Png => &[0x89, b'P', b'N', b'G'],
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, FileKind::Jpeg | FileKind::Png)
    }
}

// ── Extracted content ────────────────────────────────────────────────────

/// A transcoded image ready to attach to an inference request.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("bytes", &self.data.len())
            .field("mime_type", &self.mime_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// What the content extractor derived from an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedContent {
    /// Text layer of a document.
    Text(String),
    /// Photo or scan, resized and re-encoded.
    Image(ImagePayload),
}

// ── Fine record ──────────────────────────────────────────────────────────

/// Structured data of a fine.
///
/// Unknown values are the empty string, never `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FineRecord {
    pub reference_number: String,
    pub date: String,
    pub amount: String,
    pub location: String,
    pub reason: String,
    pub vehicle: String,
    #[serde(default)]
    pub additional_info: String,
}

impl FineRecord {
    /// JSON names of the six fields the extraction stage must return.
    pub const CORE_FIELDS: [&'static str; 6] = [
        "referenceNumber",
        "date",
        "amount",
        "location",
        "reason",
        "vehicle",
    ];

    /// `(label, value)` pairs for the core fields plus additional info.
    pub fn labelled_fields(&self) -> [(&'static str, &str); 7] {
        [
            ("Reference number", &self.reference_number),
            ("Date", &self.date),
            ("Amount", &self.amount),
            ("Location", &self.location),
            ("Reason", &self.reason),
            ("Vehicle", &self.vehicle),
            ("Additional information", &self.additional_info),
        ]
    }

    /// True when none of the six core fields carries a value.
    pub fn is_blank(&self) -> bool {
        [
            &self.reference_number,
            &self.date,
            &self.amount,
            &self.location,
            &self.reason,
            &self.vehicle,
        ]
        .iter()
        .all(|v| v.trim().is_empty())
    }
}

// ── Appeal options ───────────────────────────────────────────────────────

/// Argument strategy for the generated appeal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AppealType {
    /// Errors in how the fine was issued or served.
    Procedural,
    /// The facts stated on the fine are wrong.
    Factual,
    /// The fine has no legal basis.
    Legal,
    /// All of the above. Used for anything unrecognised.
    #[default]
    Comprehensive,
}

impl AppealType {
    /// Lenient parse: anything unknown becomes [`AppealType::Comprehensive`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "procedural" => AppealType::Procedural,
            "factual" => AppealType::Factual,
            "legal" => AppealType::Legal,
            _ => AppealType::Comprehensive,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppealType::Procedural => "procedural",
            AppealType::Factual => "factual",
            AppealType::Legal => "legal",
            AppealType::Comprehensive => "comprehensive",
        }
    }
}

impl From<String> for AppealType {
    fn from(s: String) -> Self {
        AppealType::parse(&s)
    }
}

impl fmt::Display for AppealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User choices for appeal generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppealOptions {
    pub appeal_type: AppealType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_details: Option<String>,
    #[serde(default)]
    pub include_template_text: bool,
}

// ── Appeal document ──────────────────────────────────────────────────────

/// A generated appeal plus the fine metadata used in export headers/footers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppealDocument {
    pub appeal_text: String,
    pub reference_number: String,
    pub date: String,
    pub appeal_type: AppealType,
}

impl AppealDocument {
    pub fn new(appeal_text: impl Into<String>, fine: &FineRecord, appeal_type: AppealType) -> Self {
        Self {
            appeal_text: appeal_text.into(),
            reference_number: fine.reference_number.clone(),
            date: fine.date.clone(),
            appeal_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_parsing_ignores_case_and_params() {
        assert_eq!(FileKind::from_mime("Application/PDF"), Some(FileKind::Pdf));
        assert_eq!(
            FileKind::from_mime("image/png; charset=binary"),
            Some(FileKind::Png)
        );
        assert_eq!(FileKind::from_mime("image/gif"), None);
        assert_eq!(FileKind::from_mime(""), None);
    }

    #[test]
    fn appeal_type_unknown_defaults_to_comprehensive() {
        let opts: AppealOptions =
            serde_json::from_str(r#"{"appealType":"creative","includeTemplateText":true}"#)
                .unwrap();
        assert_eq!(opts.appeal_type, AppealType::Comprehensive);
        assert!(opts.include_template_text);
        assert_eq!(opts.custom_details, None);
    }

    #[test]
    fn appeal_type_serialises_lowercase() {
        let json = serde_json::to_string(&AppealType::Factual).unwrap();
        assert_eq!(json, "\"factual\"");
        let back: AppealType = serde_json::from_str("\"FACTUAL\"").unwrap();
        assert_eq!(back, AppealType::Factual);
    }

    #[test]
    fn fine_record_uses_camel_case_and_defaults_additional_info() {
        let json = r#"{"referenceNumber":"A1","date":"2024-01-01","amount":"50",
            "location":"X","reason":"Y","vehicle":"Z"}"#;
        let rec: FineRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.reference_number, "A1");
        assert_eq!(rec.additional_info, "");
        let out = serde_json::to_string(&rec).unwrap();
        assert!(out.contains("\"additionalInfo\":\"\""));
    }

    #[test]
    fn blank_record_detection() {
        assert!(FineRecord::default().is_blank());
        let rec = FineRecord {
            amount: "40".into(),
            ..Default::default()
        };
        assert!(!rec.is_blank());
    }
}
