use thiserror::Error;

use crate::plans::UnknownPlan;
use crate::provider::ProviderError;

/// Every way a single extraction or comparison request can fail.
///
/// Grouped the way callers act on them: input validation and preconditions are
/// raised before any network call; provider failures carry the vendor's detail;
/// content failures distinguish an unreadable document from a wrong one.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid document '{file_name}': {reason}")]
    InvalidDocument { file_name: String, reason: String },

    #[error("Document '{file_name}' is {size} bytes, above the {limit} byte limit")]
    FileTooLarge {
        file_name: String,
        size: usize,
        limit: usize,
    },

    #[error("Expected exactly {expected} files, got {actual}")]
    WrongFileCount { expected: usize, actual: usize },

    #[error(transparent)]
    UnknownPlan(#[from] UnknownPlan),

    #[error("No API credential supplied for the extraction provider")]
    MissingCredential,

    #[error("Extraction provider failed: {0}")]
    Provider(#[source] ProviderError),

    #[error("Extraction provider returned an empty response")]
    EmptyResponse,

    #[error("Extraction provider response is not a JSON object: {0}")]
    NotJson(String),

    #[error("Document could not be read (no fields returned); it may be scanned, encrypted or corrupted")]
    UnreadableDocument,

    #[error("None of the {plan} fields were found; the document is probably not a {plan} document")]
    WrongDocumentType { plan: String },
}

// A reply without text is a content failure, not a transport one.
impl From<ProviderError> for ExtractionError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::EmptyContent => ExtractionError::EmptyResponse,
            other => ExtractionError::Provider(other),
        }
    }
}

impl ExtractionError {
    pub fn invalid_document(file_name: &str, reason: impl Into<String>) -> Self {
        ExtractionError::InvalidDocument {
            file_name: file_name.to_string(),
            reason: reason.into(),
        }
    }
}
