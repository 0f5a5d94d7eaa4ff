//! Uploaded PDF documents and the checks they pass before reaching a provider.

use bytes::Bytes;
use tracing::warn;

use crate::extraction::error::ExtractionError;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
const PDF_MEDIA_TYPE_ALIASES: &[&str] = &[PDF_MEDIA_TYPE, "application/x-pdf"];
const PDF_SIGNATURE: &[u8] = b"%PDF-";
/// Some generators emit a preamble before the signature; readers accept it within the first KiB.
const SIGNATURE_WINDOW: usize = 1024;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Per-document limits applied before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentLimits {
    pub max_bytes: usize,
}

impl Default for DocumentLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// One uploaded file, as received from the client.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pub file_name: String,
    pub media_type: Option<String>,
    pub bytes: Bytes,
}

impl PdfDocument {
    pub fn new(file_name: impl Into<String>, media_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            media_type,
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn declared_pdf(&self) -> bool {
        let by_media_type = self
            .media_type
            .as_deref()
            .map(|m| {
                let essence = m.split(';').next().unwrap_or_default().trim();
                PDF_MEDIA_TYPE_ALIASES
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(essence))
            })
            .unwrap_or(false);
        let by_suffix = self.file_name.to_ascii_lowercase().ends_with(".pdf");
        by_media_type || by_suffix
    }

    /// Whether the `%PDF-` signature appears near the start of the file.
    pub fn has_pdf_signature(&self) -> bool {
        let window = &self.bytes[..self.bytes.len().min(SIGNATURE_WINDOW)];
        window
            .windows(PDF_SIGNATURE.len())
            .any(|w| w == PDF_SIGNATURE)
    }

    /// Rejects non-PDF, empty and oversized uploads. A missing signature only warns:
    /// the declared type is authoritative and the provider makes the final call.
    pub fn validate(&self, limits: &DocumentLimits) -> Result<(), ExtractionError> {
        if !self.declared_pdf() {
            return Err(ExtractionError::invalid_document(
                &self.file_name,
                format!(
                    "only PDF files are accepted (media type {})",
                    self.media_type.as_deref().unwrap_or("unknown")
                ),
            ));
        }

        if self.is_empty() {
            return Err(ExtractionError::invalid_document(
                &self.file_name,
                "file is empty",
            ));
        }

        if self.len() > limits.max_bytes {
            return Err(ExtractionError::FileTooLarge {
                file_name: self.file_name.clone(),
                size: self.len(),
                limit: limits.max_bytes,
            });
        }

        if !self.has_pdf_signature() {
            warn!(
                file_name = %self.file_name,
                size = self.len(),
                "Upload declared as PDF but has no %PDF- signature; submitting anyway"
            );
        }

        Ok(())
    }
}
