//! Inquiry analyzer port.
//!
//! One operation, `analyze`, implemented once per LLM provider. Routes only
//! ever see `Arc<dyn InquiryAnalyzer>`.

use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::config::ProviderKind;
use crate::domain::{AnalysisResult, FileAttachment};
use crate::error::AnalysisError;

#[async_trait]
pub trait InquiryAnalyzer: Send + Sync {
    /// Turn inquiry text and/or a document into a validated analysis.
    ///
    /// Callers must supply non-blank text, a file, or both. Exactly one
    /// provider request is made; nothing is retried.
    async fn analyze(
        &self,
        inquiry: &str,
        file: Option<&FileAttachment>,
    ) -> Result<Analysis, AnalysisError>;

    fn info(&self) -> AnalyzerInfo;
}

/// A parsed result plus the soft validation findings about it.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerInfo {
    pub provider: &'static str,
    pub model: String,
    pub prompt_version: String,
    pub credential_configured: bool,
}

impl AnalyzerInfo {
    pub fn new(
        provider: ProviderKind,
        model: &str,
        prompt_version: &str,
        api_key: Option<&str>,
    ) -> Self {
        Self {
            provider: provider.as_str(),
            model: model.to_string(),
            prompt_version: prompt_version.to_string(),
            credential_configured: api_key.is_some(),
        }
    }
}

/// Return the API key or fail before anything touches the network.
pub(crate) fn require_key(api_key: Option<&str>) -> Result<&str, AnalysisError> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(AnalysisError::MissingCredential),
    }
}

/// Provider error envelope; Gemini and OpenAI share this outer shape.
#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: Option<ProviderErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Send a provider request and decode the success envelope.
pub(crate) async fn send_json<R: DeserializeOwned>(
    provider: ProviderKind,
    request: RequestBuilder,
) -> Result<R, AnalysisError> {
    let response = request.send().await.map_err(|e| {
        error!(provider = provider.as_str(), error = %e, "AI provider request failed");
        AnalysisError::transport(&e)
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        error!(provider = provider.as_str(), error = %e, "Failed to read AI provider response");
        AnalysisError::transport(&e)
    })?;

    if !status.is_success() {
        let message = serde_json::from_str::<ProviderErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .and_then(|d| d.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("{} returned {}", provider.as_str(), status));

        return Err(AnalysisError::Provider {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        error!(provider = provider.as_str(), error = %e, "Malformed AI provider envelope");
        AnalysisError::Provider {
            status: status.as_u16(),
            message: format!("{} returned a malformed response", provider.as_str()),
        }
    })
}

/// Parse the model's text output into a validated analysis.
///
/// Parser details are logged; callers only ever see `InvalidResponseFormat`.
pub(crate) fn parse_analysis(
    provider: ProviderKind,
    raw: &str,
) -> Result<Analysis, AnalysisError> {
    let json = strip_code_fences(raw);

    let mut result: AnalysisResult = serde_json::from_str(json).map_err(|e| {
        warn!(
            provider = provider.as_str(),
            error = %e,
            raw = %preview(raw, 200),
            "Failed to parse analysis"
        );
        AnalysisError::InvalidResponseFormat
    })?;

    let warnings = result.enforce_invariants();
    for warning in &warnings {
        warn!(provider = provider.as_str(), warning = %warning, "Analysis inconsistency");
    }

    debug!(
        provider = provider.as_str(),
        rating = result.lead_score.rating.as_str(),
        score = result.lead_score.score,
        quote = result.quote_template.is_some(),
        competitor = result.competitor_conversion.is_some(),
        "Parsed analysis"
    );

    Ok(Analysis { result, warnings })
}

/// JSON mode should never fence its output, but some models still do.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

fn preview(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
