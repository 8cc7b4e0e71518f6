//! Unified error handling
//!
//! `AnalysisError` is the failure taxonomy of one analysis attempt.
//! `ApiError` maps it (and everything else) onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub const INVALID_RESPONSE_MESSAGE: &str =
    "The AI provided an invalid response format. Please try again.";

pub const MISSING_CREDENTIAL_MESSAGE: &str =
    "API Key is missing. Please check your environment variables.";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Unsupported file type '{mime_type}'. Please upload a PDF or Word document (.pdf, .doc, .docx).")]
    UnsupportedType { mime_type: String },

    #[error("Failed to process the file: {0}")]
    Encoding(String),

    #[error("{}", MISSING_CREDENTIAL_MESSAGE)]
    MissingCredential,

    #[error("{}", INVALID_RESPONSE_MESSAGE)]
    InvalidResponseFormat,

    /// Provider answered with a non-2xx status.
    #[error("{message}")]
    Provider { status: u16, message: String },

    /// Request never produced a response (connect failure, timeout, broken body).
    #[error("AI provider unavailable: {message}")]
    Transport { message: String, timed_out: bool },
}

impl AnalysisError {
    pub fn transport(err: &reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Please enter an inquiry or attach a document.")]
    EmptyInquiry,

    #[error("Upload exceeds the maximum allowed size")]
    PayloadTooLarge,

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::EmptyInquiry => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Analysis(e) => match e {
                AnalysisError::UnsupportedType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                AnalysisError::Encoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
                AnalysisError::MissingCredential => StatusCode::SERVICE_UNAVAILABLE,
                AnalysisError::InvalidResponseFormat | AnalysisError::Provider { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                AnalysisError::Transport { timed_out: true, .. } => StatusCode::GATEWAY_TIMEOUT,
                AnalysisError::Transport { .. } => StatusCode::BAD_GATEWAY,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::EmptyInquiry => "EMPTY_INQUIRY",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::Analysis(e) => match e {
                AnalysisError::UnsupportedType { .. } => "UNSUPPORTED_FILE_TYPE",
                AnalysisError::Encoding(_) => "FILE_ENCODING",
                AnalysisError::MissingCredential => "MISSING_CREDENTIAL",
                AnalysisError::InvalidResponseFormat => "INVALID_RESPONSE_FORMAT",
                AnalysisError::Provider { .. } => "PROVIDER_ERROR",
                AnalysisError::Transport { .. } => "PROVIDER_UNAVAILABLE",
            },
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn public_message(&self) -> String {
        match self {
            // Don't leak internal error details
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(e) => {
                tracing::error!(error = ?e, "Internal server error");
            }
            Self::Analysis(AnalysisError::Provider { status, message }) => {
                tracing::error!(status = status, message = %message, "AI provider error");
            }
            Self::Analysis(AnalysisError::Transport { message, .. }) => {
                tracing::error!(message = %message, "AI provider unreachable");
            }
            _ => {
                tracing::warn!(error = %self, "API error");
            }
        }

        let status = self.status_code();
        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.public_message(),
            request_id: None, // Will be populated by middleware if available
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
