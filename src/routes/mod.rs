pub mod analyze;
pub mod health;
pub mod meta;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/meta", get(meta::get_meta))
        .route("/inquiries/analyze", post(analyze::analyze_inquiry))
}
