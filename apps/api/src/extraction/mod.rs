// Document extraction: validation, prompt construction, provider submission,
// normalization and the single/compare orchestration on top of them.
// All vendor calls go through `provider`. Nothing here speaks HTTP to a model.

pub mod document;
pub mod error;
pub mod handlers;
pub mod normalize;
pub mod prompts;
pub mod record;
pub mod service;
pub mod text;

pub use error::ExtractionError;
