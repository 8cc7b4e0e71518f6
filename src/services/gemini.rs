//! Gemini backend: schema-constrained JSON via `generateContent`.
//!
//! Differences from the OpenAI backend:
//! - API key goes in the `x-goog-api-key` header
//! - `responseSchema` mirrors `AnalysisResult` field for field
//! - documents are forwarded as `inlineData` parts of any MIME type

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use super::analyzer::{self, Analysis, AnalyzerInfo, InquiryAnalyzer};
use super::prompt::{self, PromptTemplate, DOCUMENT_ONLY_INSTRUCTION};
use crate::config::ProviderKind;
use crate::domain::FileAttachment;
use crate::error::AnalysisError;

#[derive(Clone)]
pub struct GeminiAnalyzer {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    prompt: Arc<PromptTemplate>,
}

impl GeminiAnalyzer {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout_seconds: u64,
        prompt: Arc<PromptTemplate>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            prompt,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_request<'a>(
        &'a self,
        inquiry: &str,
        file: Option<&'a FileAttachment>,
    ) -> GenerateContentRequest<'a> {
        let mut parts = Vec::new();

        if let Some(text) = prompt::inquiry_instruction(inquiry) {
            parts.push(Part::Text { text });
        }

        if let Some(file) = file {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: &file.mime_type,
                    data: &file.base64,
                },
            });
            if inquiry.trim().is_empty() {
                parts.push(Part::Text {
                    text: DOCUMENT_ONLY_INSTRUCTION.to_string(),
                });
            }
        }

        GenerateContentRequest {
            contents: vec![Content { role: "user", parts }],
            system_instruction: SystemInstruction {
                parts: vec![Part::Text {
                    text: self.prompt.text.clone(),
                }],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        }
    }
}

#[async_trait]
impl InquiryAnalyzer for GeminiAnalyzer {
    #[instrument(skip_all, fields(provider = "gemini", model = %self.model, has_file = file.is_some()))]
    async fn analyze(
        &self,
        inquiry: &str,
        file: Option<&FileAttachment>,
    ) -> Result<Analysis, AnalysisError> {
        let api_key = analyzer::require_key(self.api_key.as_deref())?;
        let body = self.build_request(inquiry, file);
        let start = Instant::now();

        let response: GenerateContentResponse = analyzer::send_json(
            ProviderKind::Gemini,
            self.client
                .post(self.endpoint())
                .header("x-goog-api-key", api_key)
                .json(&body),
        )
        .await?;

        info!(latency_ms = start.elapsed().as_millis() as u64, "Gemini responded");
        if let Some(usage) = &response.usage_metadata {
            info!(
                input_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini token usage"
            );
        }

        let text = response.text();
        if text.trim().is_empty() {
            warn!(
                finish_reason = ?response.candidates.first().and_then(|c| c.finish_reason.as_deref()),
                block_reason = ?response.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()),
                "Gemini returned no text"
            );
        }

        analyzer::parse_analysis(ProviderKind::Gemini, &text)
    }

    fn info(&self) -> AnalyzerInfo {
        AnalyzerInfo::new(
            ProviderKind::Gemini,
            &self.model,
            &self.prompt.version,
            self.api_key.as_deref(),
        )
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UsageMetadata {
    prompt_token_count: u64,
    candidates_token_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// OpenAPI-subset schema matching `AnalysisResult`.
fn response_schema() -> Value {
    let string = json!({ "type": "STRING" });

    json!({
        "type": "OBJECT",
        "properties": {
            "analysis": {
                "type": "OBJECT",
                "properties": {
                    "customerNeed": string,
                    "application": string,
                    "keyFactors": string,
                    "urgency": string
                },
                "required": ["customerNeed", "application", "keyFactors", "urgency"]
            },
            "competitorConversion": {
                "type": "OBJECT",
                "properties": {
                    "currentlyUsing": string,
                    "tatiEquivalent": string,
                    "switchingAngle": string
                }
            },
            "recommendations": {
                "type": "OBJECT",
                "properties": {
                    "primary": string,
                    "primaryReasoning": string,
                    "alternative": string,
                    "alternativeReasoning": string
                },
                "required": ["primary", "primaryReasoning"]
            },
            "quoteTemplate": {
                "type": "OBJECT",
                "properties": {
                    "company": string,
                    "contact": string,
                    "contactInfo": string,
                    "location": string,
                    "lineItems": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "product": string,
                                "quantity": string
                            }
                        }
                    },
                    "notes": string
                }
            },
            "draft": string,
            "leadScore": {
                "type": "OBJECT",
                "properties": {
                    "score": { "type": "NUMBER" },
                    "rating": { "type": "STRING", "enum": ["HOT", "WARM", "COLD"] },
                    "signals": { "type": "ARRAY", "items": string },
                    "recommendedAction": string
                },
                "required": ["score", "rating", "signals", "recommendedAction"]
            },
            "internalNotes": string,
            "language": { "type": "STRING", "enum": ["en", "es"] }
        },
        "required": ["analysis", "recommendations", "draft", "leadScore", "internalNotes", "language"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::tests::sample_result;
    use crate::domain::attachment::MIME_PDF;
    use crate::services::fake_provider::FakeProvider;
    use axum::http::StatusCode;

    fn analyzer(base_url: &str, key: Option<&str>) -> GeminiAnalyzer {
        GeminiAnalyzer::new(
            base_url,
            "gemini-test",
            key.map(str::to_string),
            5,
            Arc::new(PromptTemplate::builtin()),
        )
        .unwrap()
    }

    fn pdf() -> FileAttachment {
        FileAttachment::encode("rfq.pdf", Some(MIME_PDF), b"%PDF-1.4").unwrap()
    }

    fn envelope(text: &str) -> String {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 812, "candidatesTokenCount": 344 }
        })
        .to_string()
    }

    #[test]
    fn text_only_request_has_no_inline_data() {
        let gemini = analyzer("http://unused", Some("k"));
        let body = serde_json::to_value(gemini.build_request("Need 20 drums of biocide", None)).unwrap();

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["text"], "Analyze this inquiry: Need 20 drums of biocide");
        assert!(!body.to_string().contains("inlineData"));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            prompt::builtin_instruction()
        );
    }

    #[test]
    fn document_only_request_adds_generic_instruction() {
        let gemini = analyzer("http://unused", Some("k"));
        let file = pdf();
        let body = serde_json::to_value(gemini.build_request("  ", Some(&file))).unwrap();

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], MIME_PDF);
        assert_eq!(parts[0]["inlineData"]["data"], file.base64);
        assert_eq!(parts[1]["text"], DOCUMENT_ONLY_INSTRUCTION);
    }

    #[test]
    fn text_and_document_request_keeps_both() {
        let gemini = analyzer("http://unused", Some("k"));
        let file = pdf();
        let body = serde_json::to_value(gemini.build_request("See attached RFQ", Some(&file))).unwrap();

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "Analyze this inquiry: See attached RFQ");
        assert!(parts[1].get("inlineData").is_some());
    }

    #[test]
    fn schema_marks_required_fields() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(
            required,
            ["analysis", "recommendations", "draft", "leadScore", "internalNotes", "language"]
        );
        assert!(schema["properties"]["quoteTemplate"].get("required").is_none());
        assert_eq!(
            schema["properties"]["leadScore"]["required"],
            json!(["score", "rating", "signals", "recommendedAction"])
        );
    }

    #[tokio::test]
    async fn missing_key_fails_without_network_call() {
        let fake = FakeProvider::start(StatusCode::OK, envelope("{}")).await;
        let gemini = analyzer(&fake.base_url, None);

        let err = gemini.analyze("Need 500 gallons", None).await.unwrap_err();
        assert!(matches!(err, AnalysisError::MissingCredential));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn analyze_posts_to_generate_content() {
        let canned = serde_json::to_string(&sample_result()).unwrap();
        let fake = FakeProvider::start(StatusCode::OK, envelope(&canned)).await;
        let gemini = analyzer(&fake.base_url, Some("gm-key"));

        let analysis = gemini
            .analyze("We need 500 gallons of friction reducer", None)
            .await
            .unwrap();
        assert_eq!(analysis.result, sample_result());

        let request = fake.single_request();
        assert_eq!(request.path, "/v1beta/models/gemini-test:generateContent");
        assert_eq!(request.headers["x-goog-api-key"], "gm-key");
        assert_eq!(
            request.body["generationConfig"]["responseSchema"],
            response_schema()
        );
    }

    #[tokio::test]
    async fn text_split_across_parts_is_joined() {
        let canned = serde_json::to_string(&sample_result()).unwrap();
        let (head, tail) = canned.split_at(canned.len() / 2);
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": head }, { "text": tail }] } }]
        })
        .to_string();
        let fake = FakeProvider::start(StatusCode::OK, body).await;

        let analysis = analyzer(&fake.base_url, Some("k"))
            .analyze("inquiry", None)
            .await
            .unwrap();
        assert_eq!(analysis.result, sample_result());
    }

    #[tokio::test]
    async fn non_json_model_output_is_invalid_format() {
        let fake = FakeProvider::start(StatusCode::OK, envelope("{\"analysis\": {")).await;
        let err = analyzer(&fake.base_url, Some("k"))
            .analyze("inquiry", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidResponseFormat));
    }

    #[tokio::test]
    async fn empty_candidates_are_invalid_format() {
        let body = json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string();
        let fake = FakeProvider::start(StatusCode::OK, body).await;
        let err = analyzer(&fake.base_url, Some("k"))
            .analyze("inquiry", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidResponseFormat));
    }

    #[tokio::test]
    async fn provider_error_message_is_propagated() {
        let body = json!({
            "error": { "code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT" }
        })
        .to_string();
        let fake = FakeProvider::start(StatusCode::BAD_REQUEST, body).await;

        match analyzer(&fake.base_url, Some("bad")).analyze("inquiry", None).await {
            Err(AnalysisError::Provider { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid. Please pass a valid API key.");
            }
            other => panic!("expected provider error, got {:?}", other),
        }
        assert_eq!(fake.requests().len(), 1, "no retries");
    }

    #[tokio::test]
    async fn provider_error_without_body_uses_fallback_message() {
        let fake = FakeProvider::start(StatusCode::SERVICE_UNAVAILABLE, "upstream down").await;
        match analyzer(&fake.base_url, Some("k")).analyze("inquiry", None).await {
            Err(AnalysisError::Provider { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "gemini returned 503 Service Unavailable");
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unreachable_provider_is_transport_error() {
        // Port 9 on loopback has nothing listening.
        let err = analyzer("http://127.0.0.1:9", Some("k"))
            .analyze("inquiry", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Transport { .. }));
    }
}
