//! Inquiry analysis endpoint.
//!
//! The browser posts a multipart form with an optional `inquiry` text field
//! and an optional `file` field. At least one of the two must carry
//! content, otherwise the analyzer is never called.

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::DataResponse;
use crate::app::AppState;
use crate::domain::{AnalysisResult, FileAttachment};
use crate::error::{AnalysisError, ApiError, ApiResult};
use crate::middleware::request_id::RequestIdExt;
use crate::services::report::render_markdown;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub provider: &'static str,
    pub model: String,
    pub prompt_version: String,
    pub analyzed_at: DateTime<Utc>,
    pub warnings: Vec<String>,
    pub result: AnalysisResult,
}

/// Inquiry form as submitted by the browser.
#[derive(Debug, Default)]
struct InquiryForm {
    inquiry: String,
    file: Option<FileAttachment>,
}

/// Analyze a customer inquiry.
///
/// POST /inquiries/analyze[?format=markdown]
pub async fn analyze_inquiry(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AnalyzeQuery>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let form = read_form(multipart).await?;

    if form.inquiry.trim().is_empty() && form.file.is_none() {
        return Err(ApiError::EmptyInquiry);
    }

    tracing::info!(
        request_id = headers.request_id().unwrap_or("-"),
        inquiry_chars = form.inquiry.chars().count(),
        file = form.file.as_ref().map(|f| f.name.as_str()).unwrap_or("-"),
        "Analyzing inquiry"
    );

    let analysis = state
        .analyzer
        .analyze(&form.inquiry, form.file.as_ref())
        .await?;

    tracing::info!(
        rating = analysis.result.lead_score.rating.as_str(),
        score = analysis.result.lead_score.score,
        warnings = analysis.warnings.len(),
        "Inquiry analyzed"
    );

    let response = match query.format {
        ReportFormat::Json => {
            let info = state.analyzer.info();
            DataResponse::new(AnalysisResponse {
                provider: info.provider,
                model: info.model,
                prompt_version: info.prompt_version,
                analyzed_at: Utc::now(),
                warnings: analysis.warnings,
                result: analysis.result,
            })
            .into_response()
        }
        ReportFormat::Markdown => (
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            render_markdown(&analysis.result),
        )
            .into_response(),
    };

    Ok(response)
}

async fn read_form(mut multipart: Multipart) -> ApiResult<InquiryForm> {
    let mut form = InquiryForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "inquiry" => {
                form.inquiry = field.text().await.map_err(multipart_error)?;
            }
            "file" => {
                if form.file.is_some() {
                    return Err(ApiError::BadRequest(
                        "Only one file may be attached".to_string(),
                    ));
                }

                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|e| {
                    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                        ApiError::PayloadTooLarge
                    } else {
                        AnalysisError::Encoding(e.body_text()).into()
                    }
                })?;

                // An untouched file input still submits an empty, unnamed part.
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }

                let display_name = if file_name.is_empty() { "attachment" } else { file_name.as_str() };
                form.file = Some(FileAttachment::encode(
                    display_name,
                    content_type.as_deref(),
                    &bytes,
                )?);
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown form field");
            }
        }
    }

    Ok(form)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
