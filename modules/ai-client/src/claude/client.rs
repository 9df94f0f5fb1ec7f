use tracing::debug;

use super::types::{ChatRequest, ChatResponse};
use crate::error::{AiError, Result};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Thin wrapper over the Messages endpoint. Holds no per-call state, so one
/// instance serves concurrent callers.
pub(crate) struct ClaudeClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl ClaudeClient {
    pub fn new(api_key: &str, http: reqwest::Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
            base_url: ANTHROPIC_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub async fn create_message(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(AiError::Config("Anthropic API key is empty".into()));
        }

        debug!(
            model = %request.model,
            tools = request.tools.len(),
            base_url = %self.base_url,
            "Claude messages request"
        );

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response.text().await.unwrap_or_default();
        Err(AiError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
