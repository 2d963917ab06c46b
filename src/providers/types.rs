// Unified request/response types for completion providers
//
// The chain only ever sends single-turn text prompts, so messages carry plain
// string content. Responses keep the block structure so providers that return
// several text segments can be joined in one place.

use serde::{Deserialize, Serialize};

/// A single conversation message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Unified request format for all completion providers
///
/// Each provider implementation transforms this into its own API format.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderRequest {
    /// Conversation messages
    pub messages: Vec<Message>,

    /// Model name (empty = provider default)
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ProviderRequest {
    /// Create a new request from messages
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: String::new(), // Will be set by provider
            max_tokens: crate::config::constants::DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A block of response content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    /// Tool calls, thinking blocks and anything else the chain never asks for
    #[serde(other)]
    Unsupported,
}

impl ContentBlock {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Unsupported => None,
        }
    }
}

/// Unified response format from all providers
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Response ID
    pub id: String,

    /// Model that generated the response
    pub model: String,

    /// Content blocks
    pub content: Vec<ContentBlock>,

    /// Stop reason ("end_turn", "max_tokens", "stop", ...)
    pub stop_reason: Option<String>,

    /// Provider that generated this response
    pub provider: String,
}

impl ProviderResponse {
    /// Concatenated text of every text block
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| b.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    /// True when generation stopped on the token limit
    pub fn is_truncated(&self) -> bool {
        matches!(self.stop_reason.as_deref(), Some("max_tokens") | Some("length"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder_defaults() {
        let request = ProviderRequest::new(vec![Message::user("hi")]);
        assert!(request.model.is_empty());
        assert_eq!(request.max_tokens, 4096);
        assert!(request.temperature.is_none());
    }

    #[test]
    fn test_request_builder_overrides() {
        let request = ProviderRequest::new(vec![Message::user("hi")])
            .with_model("claude-3-opus-20240229")
            .with_max_tokens(100)
            .with_temperature(0.2);
        assert_eq!(request.model, "claude-3-opus-20240229");
        assert_eq!(request.max_tokens, 100);
        assert_eq!(request.temperature, Some(0.2));
    }

    #[test]
    fn test_request_serialization_skips_unset_options() {
        let request = ProviderRequest::new(vec![Message::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_response_text_joins_text_blocks_only() {
        let blocks: Vec<ContentBlock> = serde_json::from_str(
            r#"[
                {"type": "text", "text": "Hello, "},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "world"}
            ]"#,
        )
        .unwrap();
        let response = ProviderResponse {
            id: "msg_1".into(),
            model: "m".into(),
            content: blocks,
            stop_reason: Some("end_turn".into()),
            provider: "claude".into(),
        };
        assert_eq!(response.text(), "Hello, world");
        assert!(!response.is_truncated());
    }

    #[test]
    fn test_response_truncation_flag() {
        let response = ProviderResponse {
            id: String::new(),
            model: String::new(),
            content: vec![],
            stop_reason: Some("max_tokens".into()),
            provider: "claude".into(),
        };
        assert!(response.is_truncated());
        assert_eq!(response.text(), "");
    }
}
