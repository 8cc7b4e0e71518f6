//! Service layer: the LLM-backed inquiry analyzers and their prompt.

pub mod analyzer;
pub mod gemini;
pub mod openai;
pub mod prompt;
pub mod report;

#[cfg(test)]
pub mod fake_provider;

use anyhow::Result;
use std::sync::Arc;

use crate::config::{ProviderKind, Settings};

pub use analyzer::{Analysis, AnalyzerInfo, InquiryAnalyzer};
pub use gemini::GeminiAnalyzer;
pub use openai::OpenAiAnalyzer;
pub use prompt::PromptTemplate;

/// Build the analyzer selected by `LLM_PROVIDER`.
pub fn build_analyzer(settings: &Settings) -> Result<Arc<dyn InquiryAnalyzer>> {
    let prompt = Arc::new(PromptTemplate::load(settings.prompt_template_path.as_deref())?);

    let analyzer: Arc<dyn InquiryAnalyzer> = match settings.provider {
        ProviderKind::Gemini => Arc::new(GeminiAnalyzer::new(
            &settings.gemini_base_url,
            &settings.gemini_model,
            settings.api_key.clone(),
            settings.ai_timeout_seconds,
            prompt,
        )?),
        ProviderKind::OpenAi => Arc::new(OpenAiAnalyzer::new(
            &settings.openai_base_url,
            &settings.openai_model,
            settings.api_key.clone(),
            settings.ai_timeout_seconds,
            prompt,
        )?),
    };

    let info = analyzer.info();
    if info.credential_configured {
        tracing::info!(provider = info.provider, model = %info.model, prompt = %info.prompt_version, "Inquiry analyzer initialized");
    } else {
        tracing::warn!(
            provider = info.provider,
            env_key = settings.provider.env_key(),
            "No API key configured - analysis requests will fail until one is set"
        );
    }

    Ok(analyzer)
}
