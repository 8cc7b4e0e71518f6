use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// JSON lines in production unless `LOG_FORMAT` says otherwise.
    pub fn resolve(raw: Option<&str>, env: &Environment) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("json") => Self::Json,
            Some("pretty") | Some("text") => Self::Pretty,
            _ if matches!(env, Environment::Prod) => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Which hosted model backs the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
}

impl ProviderKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "openai" | "gpt" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    /// Provider-specific variable checked before the shared `API_KEY`.
    pub fn env_key(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,
    pub log_format: LogFormat,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // LLM provider
    pub provider: ProviderKind,
    /// Absent keys are reported per request, not at startup.
    pub api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub ai_timeout_seconds: u64,

    // Uploads
    pub max_upload_bytes: usize,

    // Prompt
    pub prompt_template_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let log_format = LogFormat::resolve(non_empty_var("LOG_FORMAT").as_deref(), &env);

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // LLM provider
        let provider_raw = env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let provider = match ProviderKind::parse(&provider_raw) {
            Some(p) => p,
            None => bail!("LLM_PROVIDER must be 'gemini' or 'openai', got '{}'", provider_raw),
        };
        let api_key = non_empty_var(provider.env_key()).or_else(|| non_empty_var("API_KEY"));

        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-3-flash-preview".to_string());
        let gemini_base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());
        let openai_model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let openai_base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let ai_timeout_seconds = parse_var("AI_TIMEOUT_SECONDS")?.unwrap_or(120); // 2 minutes for LLM calls

        // Uploads
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES")?.unwrap_or(20 * 1024 * 1024);

        // Prompt
        let prompt_template_path = non_empty_var("PROMPT_TEMPLATE_PATH").map(PathBuf::from);

        Ok(Settings {
            env,
            server_addr,
            log_format,
            cors_allow_origins,
            provider,
            api_key,
            gemini_model,
            gemini_base_url,
            openai_model,
            openai_base_url,
            ai_timeout_seconds,
            max_upload_bytes,
            prompt_template_path,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Settings {
            env: Environment::Dev,
            server_addr: "127.0.0.1:0".to_string(),
            log_format: LogFormat::Pretty,
            cors_allow_origins: vec!["http://localhost:3000".to_string()],
            provider: ProviderKind::Gemini,
            api_key: Some("test-key".to_string()),
            gemini_model: "gemini-test".to_string(),
            gemini_base_url: "http://127.0.0.1:9".to_string(),
            openai_model: "gpt-test".to_string(),
            openai_base_url: "http://127.0.0.1:9".to_string(),
            ai_timeout_seconds: 5,
            max_upload_bytes: 1024 * 1024,
            prompt_template_path: None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a number, got '{}'", key, raw)),
        None => Ok(None),
    }
}
