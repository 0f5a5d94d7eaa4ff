pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::extraction::handlers;
use crate::plans::handlers as plan_handlers;
use crate::state::AppState;

/// Room for form fields and multipart framing on top of the files themselves.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    // Compare requests carry two files; the per-file ceiling is enforced later with a
    // precise error, so the transport limit only has to let both through.
    let body_limit = state
        .config
        .limits
        .max_bytes
        .saturating_mul(2)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/plans", get(plan_handlers::handle_list_plans))
        .route(
            "/api/v1/plans/:plan/fields",
            get(plan_handlers::handle_plan_fields),
        )
        .route("/api/v1/extract", post(handlers::handle_extract))
        .route("/api/v1/compare", post(handlers::handle_compare))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
