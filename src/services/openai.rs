//! OpenAI backend: chat completions in JSON mode.
//!
//! No response schema is sent; `response_format: json_object` only
//! guarantees syntactically valid JSON, so the shared parser does the rest.
//! Attachments: images go in as `image_url` data URLs, PDFs as `file`
//! parts. Word documents have no chat-completions input type and are left
//! out of the request.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use super::analyzer::{self, Analysis, AnalyzerInfo, InquiryAnalyzer};
use super::prompt::{self, PromptTemplate, DOCUMENT_ONLY_INSTRUCTION};
use crate::config::ProviderKind;
use crate::domain::attachment::MIME_PDF;
use crate::domain::FileAttachment;
use crate::error::AnalysisError;

#[derive(Clone)]
pub struct OpenAiAnalyzer {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    prompt: Arc<PromptTemplate>,
}

impl OpenAiAnalyzer {
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

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(&'a self, inquiry: &str, file: Option<&'a FileAttachment>) -> ChatRequest<'a> {
        let user_content = match file {
            None => MessageContent::Text(
                prompt::inquiry_instruction(inquiry)
                    .unwrap_or_else(|| format!("{}{}", prompt::INQUIRY_PREFIX, inquiry)),
            ),
            Some(file) => {
                let text = prompt::inquiry_instruction(inquiry)
                    .unwrap_or_else(|| DOCUMENT_ONLY_INSTRUCTION.to_string());
                let mut parts = vec![ContentPart::Text { text }];

                if file.is_image() {
                    parts.push(ContentPart::ImageUrl {
                        image_url: ImageUrl { url: file.data_url() },
                    });
                } else if file.mime_type == MIME_PDF {
                    parts.push(ContentPart::File {
                        file: FileData {
                            filename: &file.name,
                            file_data: file.data_url(),
                        },
                    });
                } else {
                    warn!(
                        mime_type = %file.mime_type,
                        name = %file.name,
                        "OpenAI cannot take this document type inline; sending text only"
                    );
                }

                MessageContent::Parts(parts)
            }
        };

        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(self.prompt.text.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

#[async_trait]
impl InquiryAnalyzer for OpenAiAnalyzer {
    #[instrument(skip_all, fields(provider = "openai", model = %self.model, has_file = file.is_some()))]
    async fn analyze(
        &self,
        inquiry: &str,
        file: Option<&FileAttachment>,
    ) -> Result<Analysis, AnalysisError> {
        let api_key = analyzer::require_key(self.api_key.as_deref())?;
        let body = self.build_request(inquiry, file);
        let start = Instant::now();

        let response: ChatResponse = analyzer::send_json(
            ProviderKind::OpenAi,
            self.client
                .post(self.completions_url())
                .bearer_auth(api_key)
                .json(&body),
        )
        .await?;

        info!(latency_ms = start.elapsed().as_millis() as u64, "OpenAI responded");
        if let Some(usage) = &response.usage {
            info!(
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.completion_tokens,
                "OpenAI token usage"
            );
        }

        let choice = response.choices.into_iter().next();
        if let Some(reason) = choice.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            if reason != "stop" {
                warn!(finish_reason = reason, "OpenAI completion did not stop cleanly");
            }
        }

        let text = choice
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        analyzer::parse_analysis(ProviderKind::OpenAi, &text)
    }

    fn info(&self) -> AnalyzerInfo {
        AnalyzerInfo::new(
            ProviderKind::OpenAi,
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
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(String),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
    File { file: FileData<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct FileData<'a> {
    filename: &'a str,
    file_data: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::tests::sample_result;
    use crate::domain::attachment::MIME_DOCX;
    use crate::services::fake_provider::FakeProvider;
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    fn analyzer(base_url: &str, key: Option<&str>) -> OpenAiAnalyzer {
        OpenAiAnalyzer::new(
            base_url,
            "gpt-test",
            key.map(str::to_string),
            5,
            Arc::new(PromptTemplate::builtin()),
        )
        .unwrap()
    }

    fn completion(content: &str) -> String {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "gpt-test",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 900, "completion_tokens": 410, "total_tokens": 1310 }
        })
        .to_string()
    }

    fn request_json(openai: &OpenAiAnalyzer, inquiry: &str, file: Option<&FileAttachment>) -> Value {
        serde_json::to_value(openai.build_request(inquiry, file)).unwrap()
    }

    #[test]
    fn text_only_request_is_plain_string_content() {
        let openai = analyzer("http://unused", Some("k"));
        let body = request_json(&openai, "Need 20 drums of biocide", None);

        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["response_format"], json!({ "type": "json_object" }));
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], prompt::builtin_instruction());
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(
            body["messages"][1]["content"],
            "Analyze this inquiry: Need 20 drums of biocide"
        );
    }

    #[test]
    fn image_attachment_becomes_data_url() {
        let openai = analyzer("http://unused", Some("k"));
        let image = FileAttachment {
            base64: "iVBORw0KGgo=".into(),
            mime_type: "image/png".into(),
            name: "label.png".into(),
        };
        let body = request_json(&openai, "", Some(&image));

        let parts = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts[0], json!({ "type": "text", "text": DOCUMENT_ONLY_INSTRUCTION }));
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn pdf_attachment_becomes_file_part() {
        let openai = analyzer("http://unused", Some("k"));
        let pdf = FileAttachment::encode("rfq.pdf", Some(MIME_PDF), b"%PDF").unwrap();
        let body = request_json(&openai, "See attached", Some(&pdf));

        let parts = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts[0]["text"], "Analyze this inquiry: See attached");
        assert_eq!(parts[1]["type"], "file");
        assert_eq!(parts[1]["file"]["filename"], "rfq.pdf");
        assert_eq!(parts[1]["file"]["file_data"], pdf.data_url());
    }

    #[test]
    fn word_attachment_is_not_forwarded() {
        let openai = analyzer("http://unused", Some("k"));
        let docx = FileAttachment::encode("rfq.docx", Some(MIME_DOCX), b"PK").unwrap();
        let body = request_json(&openai, "", Some(&docx));

        let parts = body["messages"][1]["content"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0]["text"], DOCUMENT_ONLY_INSTRUCTION);
    }

    #[tokio::test]
    async fn missing_key_fails_without_network_call() {
        let fake = FakeProvider::start(StatusCode::OK, completion("{}")).await;
        let err = analyzer(&fake.base_url, None)
            .analyze("Need 500 gallons", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingCredential));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn analyze_posts_chat_completion() {
        let canned = serde_json::to_string(&sample_result()).unwrap();
        let fake = FakeProvider::start(StatusCode::OK, completion(&canned)).await;

        let analysis = analyzer(&fake.base_url, Some("sk-test"))
            .analyze("We need 500 gallons of friction reducer", None)
            .await
            .unwrap();
        assert_eq!(analysis.result, sample_result());

        let request = fake.single_request();
        assert_eq!(request.path, "/chat/completions");
        assert_eq!(request.headers["authorization"], "Bearer sk-test");
        assert_eq!(request.body["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn null_content_is_invalid_format() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": null }, "finish_reason": "length" }]
        })
        .to_string();
        let fake = FakeProvider::start(StatusCode::OK, body).await;

        let err = analyzer(&fake.base_url, Some("k"))
            .analyze("inquiry", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidResponseFormat));
    }

    #[tokio::test]
    async fn rate_limit_is_provider_error_with_message() {
        let body = json!({
            "error": { "message": "Rate limit reached for gpt-test", "type": "requests", "code": "rate_limit_exceeded" }
        })
        .to_string();
        let fake = FakeProvider::start(StatusCode::TOO_MANY_REQUESTS, body).await;

        match analyzer(&fake.base_url, Some("k")).analyze("inquiry", None).await {
            Err(AnalysisError::Provider { status, message }) => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit reached for gpt-test");
            }
            other => panic!("expected provider error, got {:?}", other),
        }
        assert_eq!(fake.requests().len(), 1, "no retries");
    }
}
