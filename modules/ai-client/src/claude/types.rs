use serde::{Deserialize, Serialize};

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    User,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

// =============================================================================
// Tool Definition
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ToolDefinitionWire {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

// =============================================================================
// Messages Request
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinitionWire>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 8192,
            messages: Vec::new(),
            system: None,
            temperature: None,
            tools: Vec::new(),
            tool_choice: None,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn message(mut self, message: WireMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Register a tool and force the model to call it.
    pub fn forced_tool(mut self, tool: ToolDefinitionWire) -> Self {
        self.tool_choice = Some(serde_json::json!({
            "type": "tool",
            "name": tool.name,
        }));
        self.tools.push(tool);
        self
    }
}

// =============================================================================
// Messages Response
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

impl ChatResponse {
    /// Input of the first `tool_use` block named `tool_name`.
    pub fn tool_input(self, tool_name: &str) -> Option<serde_json::Value> {
        self.content.into_iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input } if name == tool_name => Some(input),
            _ => None,
        })
    }

    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_tool_sets_choice() {
        let request = ChatRequest::new("claude").forced_tool(ToolDefinitionWire {
            name: "structured_response".into(),
            description: "d".into(),
            input_schema: serde_json::json!({"type": "object"}),
        });
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["tool_choice"]["name"], "structured_response");
        assert_eq!(json["tools"].as_array().unwrap().len(), 1);
        assert!(json.get("system").is_none());
    }

    #[test]
    fn tool_input_skips_unknown_blocks() {
        let json = r#"{
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Here you go"},
                {"type": "tool_use", "id": "t1", "name": "structured_response", "input": {"learnings": []}}
            ],
            "stop_reason": "tool_use"
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("Here you go"));
        let input = response.tool_input("structured_response").unwrap();
        assert!(input["learnings"].is_array());
    }
}
