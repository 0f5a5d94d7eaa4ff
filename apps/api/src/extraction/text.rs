use tracing::warn;

use crate::extraction::document::PdfDocument;
use crate::extraction::error::ExtractionError;

/// Extracts the document's text layer on a blocking thread.
///
/// A PDF that fails to parse or has no text layer (scans, image-only exports) is
/// reported as unreadable.
pub async fn extract_text(document: &PdfDocument) -> Result<String, ExtractionError> {
    let bytes = document.bytes.clone();
    let file_name = document.file_name.clone();

    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| {
            warn!(file_name = %file_name, error = %e, "PDF text extraction task failed");
            ExtractionError::UnreadableDocument
        })?
        .map_err(|e| {
            warn!(file_name = %file_name, error = %e, "PDF text extraction failed");
            ExtractionError::UnreadableDocument
        })?;

    let text = text.trim();
    if text.is_empty() {
        warn!(file_name = %file_name, "PDF has no extractable text");
        return Err(ExtractionError::UnreadableDocument);
    }
    Ok(text.to_string())
}
