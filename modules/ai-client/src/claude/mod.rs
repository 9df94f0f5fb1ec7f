mod client;
pub(crate) mod types;

use serde_json::Value;
use tracing::warn;

use crate::error::{AiError, Result};
use crate::util::truncate_chars;
use client::ClaudeClient;
use types::*;

const STRUCTURED_TOOL: &str = "structured_response";

// =============================================================================
// Claude
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key, self.http.clone());
        match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        }
    }

    /// Structured output via a forced tool call whose input schema is `schema`.
    pub async fn extract_value(
        &self,
        schema_name: &str,
        system_prompt: &str,
        user_prompt: &str,
        schema: Value,
    ) -> Result<Value> {
        let request = ChatRequest::new(&self.model)
            .system(system_prompt)
            .message(WireMessage::user(user_prompt))
            .temperature(0.0)
            .forced_tool(ToolDefinitionWire {
                name: STRUCTURED_TOOL.to_string(),
                description: format!("Return the {schema_name} as structured data."),
                input_schema: schema,
            });

        let response = self.client().create_message(&request).await?;

        if response.stop_reason.as_deref() == Some("max_tokens") {
            warn!(model = %self.model, schema = schema_name, "Claude hit max_tokens during structured output");
        }

        structured_input(response)
    }
}

/// The forced tool's input. A reply that answered in prose instead is reported
/// with its text.
fn structured_input(response: ChatResponse) -> Result<Value> {
    let text = response.text().map(|t| truncate_chars(t, 200).to_string());
    response.tool_input(STRUCTURED_TOOL).ok_or_else(|| match text {
        Some(text) => AiError::Parse(format!("no structured output in Claude response: {text}")),
        None => AiError::Parse("no structured output in Claude response".into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_new() {
        let ai = Claude::new("sk-ant-test", "claude-sonnet-4-20250514");
        assert_eq!(ai.model(), "claude-sonnet-4-20250514");
        assert_eq!(ai.api_key, "sk-ant-test");
    }

    #[test]
    fn prose_reply_is_a_parse_error_quoting_the_text() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"content": [{"type": "text", "text": "I cannot help with that."}], "stop_reason": "end_turn"}"#,
        )
        .unwrap();

        let err = structured_input(response).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Parse error: no structured output in Claude response: I cannot help with that."
        );
    }

    #[test]
    fn test_claude_with_base_url() {
        let ai = Claude::new("sk-ant-test", "claude-sonnet-4-20250514")
            .with_base_url("https://custom.api.com");
        assert_eq!(ai.base_url.as_deref(), Some("https://custom.api.com"));
    }
}
