use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::services::AnalyzerInfo;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub analyzer: AnalyzerInfo,
}

/// Health check endpoint - public
///
/// Never calls the provider. A missing API key reports `degraded` since the
/// process is up but every analysis would fail.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let analyzer = state.analyzer.info();

    let status = if analyzer.credential_configured {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        analyzer,
    })
}
