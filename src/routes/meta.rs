//! Static data the browser shell renders around the analyzer.

use axum::extract::State;
use serde::Serialize;
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::domain::attachment::ALLOWED_MIME_TYPES;
use crate::domain::company::{CompanyInfo, COMPANY_INFO, LOADING_MESSAGES, LOADING_MESSAGE_INTERVAL_MS};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaResponse {
    pub company: CompanyInfo,
    pub loading_messages: &'static [&'static str],
    pub loading_message_interval_ms: u64,
    pub allowed_mime_types: &'static [&'static str],
    pub max_upload_bytes: usize,
}

/// GET /meta
pub async fn get_meta(State(state): State<Arc<AppState>>) -> DataResponse<MetaResponse> {
    DataResponse::new(MetaResponse {
        company: COMPANY_INFO,
        loading_messages: &LOADING_MESSAGES,
        loading_message_interval_ms: LOADING_MESSAGE_INTERVAL_MS,
        allowed_mime_types: &ALLOWED_MIME_TYPES,
        max_upload_bytes: state.settings.max_upload_bytes,
    })
}
