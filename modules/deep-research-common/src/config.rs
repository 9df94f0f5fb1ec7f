use std::env;
use std::path::PathBuf;

use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_FIRECRAWL_URL: &str = "https://api.firecrawl.dev";

/// Character budget for everything stuffed into one prompt (~128k tokens).
pub const DEFAULT_CONTEXT_CHARS: usize = 400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    OpenAi,
    Anthropic,
}

impl AiProvider {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(AiProvider::OpenAi),
            "anthropic" | "claude" => Some(AiProvider::Anthropic),
            _ => None,
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            AiProvider::OpenAi => "OPENAI_API_KEY",
            AiProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            AiProvider::OpenAi => DEFAULT_OPENAI_MODEL,
            AiProvider::Anthropic => DEFAULT_ANTHROPIC_MODEL,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Inference service
    pub provider: AiProvider,
    pub ai_api_key: String,
    pub model: String,
    pub ai_base_url: Option<String>,

    // Search service
    pub firecrawl_api_key: Option<String>,
    pub firecrawl_base_url: String,
    pub concurrency: usize,

    // Output
    pub output_dir: PathBuf,
    pub context_chars: usize,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match var("AI_PROVIDER") {
            Some(raw) => AiProvider::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "AI_PROVIDER",
                value: raw.clone(),
                reason: "expected `openai` or `anthropic`".into(),
            })?,
            None => AiProvider::OpenAi,
        };

        let key_var = provider.key_var();
        let ai_api_key = var(key_var).ok_or(ConfigError::Missing(key_var))?;

        Ok(Self {
            provider,
            ai_api_key,
            model: var("AI_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            ai_base_url: var("AI_BASE_URL"),
            firecrawl_api_key: var("FIRECRAWL_API_KEY"),
            firecrawl_base_url: var("FIRECRAWL_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FIRECRAWL_URL.to_string()),
            concurrency: parse_positive("FIRECRAWL_CONCURRENCY", var("FIRECRAWL_CONCURRENCY"), 1)?,
            output_dir: var("RESEARCH_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            context_chars: parse_positive(
                "RESEARCH_CONTEXT_CHARS",
                var("RESEARCH_CONTEXT_CHARS"),
                DEFAULT_CONTEXT_CHARS,
            )?,
        })
    }

    /// Log the effective configuration without secrets.
    pub fn log_redacted(&self) {
        info!(
            provider = ?self.provider,
            model = %self.model,
            ai_base_url = self.ai_base_url.as_deref().unwrap_or("default"),
            ai_api_key = redact(&self.ai_api_key),
            firecrawl_base_url = %self.firecrawl_base_url,
            firecrawl_api_key = self.firecrawl_api_key.as_deref().map(redact).unwrap_or("unset"),
            concurrency = self.concurrency,
            output_dir = %self.output_dir.display(),
            context_chars = self.context_chars,
            "Configuration loaded"
        );
    }
}

fn parse_positive(
    key: &'static str,
    raw: Option<String>,
    default: usize,
) -> Result<usize, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be at least 1".into(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "unset"
    } else {
        "[redacted]"
    }
}
