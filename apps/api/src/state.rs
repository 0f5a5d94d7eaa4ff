use std::sync::Arc;

use crate::config::Config;
use crate::provider::DocumentExtractionProvider;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Vendor adapter chosen at startup from `EXTRACTION_PROVIDER`.
    pub provider: Arc<dyn DocumentExtractionProvider>,
}
