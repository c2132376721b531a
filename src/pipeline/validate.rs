//! Upload validation: reject bad files before any work is done.
//!
//! Checks run cheapest-first and never touch the network or decode anything:
//! declared type, declared size, actual size, then the leading magic bytes.
//! A file that passes is guaranteed to be one of the three supported kinds
//! and within the size ceiling; a file that fails is never handed to the
//! extractor.

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::error::AppealError;
use crate::model::{FileKind, UploadedFile};
use tracing::debug;

/// Stateless upload validator.
#[derive(Debug, Clone, Copy)]
pub struct FileValidator {
    max_bytes: u64,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

impl FileValidator {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Validate an upload and return its kind.
    pub fn validate(&self, file: &UploadedFile) -> Result<FileKind, AppealError> {
        let kind = FileKind::from_mime(&file.mime_type).ok_or_else(|| {
            AppealError::UnsupportedFileType {
                mime_type: file.mime_type.clone(),
            }
        })?;

        if file.declared_size > self.max_bytes {
            return Err(AppealError::FileTooLarge {
                size: file.declared_size,
                limit: self.max_bytes,
            });
        }

        let actual = file.bytes.len() as u64;
        if actual == 0 {
            return Err(AppealError::EmptyFile);
        }
        if actual > self.max_bytes {
            return Err(AppealError::FileTooLarge {
                size: actual,
                limit: self.max_bytes,
            });
        }

        if !file.bytes.starts_with(kind.magic()) {
            return Err(AppealError::ContentMismatch {
                mime_type: file.mime_type.clone(),
                magic: file.bytes.iter().take(4).copied().collect(),
            });
        }

        debug!("Validated upload: {:?}, {} bytes", kind, actual);
        Ok(kind)
    }
}
