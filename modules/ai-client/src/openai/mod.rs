mod client;
pub(crate) mod types;

use serde_json::Value;

use crate::error::Result;
use crate::util::strip_code_blocks;
use client::OpenAiClient;

// =============================================================================
// OpenAi
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    /// Point at an OpenAI-compatible endpoint (Azure, vLLM, Ollama, ...).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> OpenAiClient {
        let client = OpenAiClient::new(&self.api_key, self.http.clone());
        match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        }
    }

    /// Structured output against a raw JSON schema, returning the parsed JSON value.
    pub async fn extract_value(
        &self,
        schema_name: &str,
        system_prompt: &str,
        user_prompt: &str,
        schema: Value,
    ) -> Result<Value> {
        let request = types::StructuredRequest {
            model: self.model.clone(),
            messages: vec![
                types::WireMessage::system(system_prompt),
                types::WireMessage::user(user_prompt),
            ],
            temperature: types::supports_temperature(&self.model).then_some(0.0),
            response_format: types::ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: types::JsonSchemaFormat {
                    name: schema_name.to_string(),
                    strict: true,
                    schema,
                },
            },
        };

        let json_str = self.client().structured_output(&request).await?;
        Ok(serde_json::from_str(strip_code_blocks(&json_str))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_new() {
        let ai = OpenAi::new("sk-test", "gpt-4o");
        assert_eq!(ai.model(), "gpt-4o");
        assert_eq!(ai.api_key, "sk-test");
        assert!(ai.base_url.is_none());
    }

    #[test]
    fn test_openai_with_base_url() {
        let ai = OpenAi::new("sk-test", "gpt-4o").with_base_url("http://localhost:11434/v1");
        assert_eq!(ai.base_url.as_deref(), Some("http://localhost:11434/v1"));
    }
}
