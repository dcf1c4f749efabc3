//! Hosted conversational model abstraction.
//!
//! The transcript types here are provider-neutral. Each backend maps them to
//! its own wire format: [`anthropic`] for the Anthropic Messages API and
//! [`bedrock`] for the Amazon Bedrock Converse API. Backends are selected
//! from configuration via [`build_model_client`].

pub mod anthropic;
pub mod bedrock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ModelConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One block of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    /// The model asks for a tool. `id` is the correlation token.
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    /// Our answer to the `ToolUse` whose `id` equals `tool_use_id`.
    ToolResult {
        tool_use_id: String,
        content: Value,
        is_error: bool,
    },
}

/// A borrowed view of a tool-use request inside a message.
#[derive(Debug, Clone, Copy)]
pub struct ToolUseRef<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub input: &'a Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// All text blocks concatenated; empty if there are none.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_uses(&self) -> impl Iterator<Item = ToolUseRef<'_>> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(ToolUseRef { id, name, input }),
            _ => None,
        })
    }

    /// Remove every `ToolUse` block, returning how many were dropped.
    pub fn strip_tool_uses(&mut self) -> usize {
        let before = self.content.len();
        self.content
            .retain(|block| !matches!(block, ContentBlock::ToolUse { .. }));
        before - self.content.len()
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    ToolUse,
    EndTurn,
    MaxTokens,
    StopSequence,
    Other(String),
}

impl StopReason {
    /// Both supported APIs use the same snake_case vocabulary.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "tool_use" => Self::ToolUse,
            "end_turn" => Self::EndTurn,
            "max_tokens" => Self::MaxTokens,
            "stop_sequence" => Self::StopSequence,
            other => Self::Other(other.to_string()),
        }
    }
}

/// A tool as advertised to the model: name, description, JSON schema of its input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub system: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub message: Message,
    pub stop_reason: StopReason,
    pub usage: Option<TokenUsage>,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn converse(&self, request: ModelRequest<'_>) -> Result<ModelResponse>;
    fn model_name(&self) -> &str;
}

#[async_trait]
impl ModelClient for Box<dyn ModelClient> {
    async fn converse(&self, request: ModelRequest<'_>) -> Result<ModelResponse> {
        (**self).converse(request).await
    }
    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Create a model client from config.
///
/// Supported providers: `"bedrock"` (Converse API with a Bedrock API key) and
/// `"anthropic"` (Messages API).
pub fn build_model_client(config: &ModelConfig) -> Result<Box<dyn ModelClient>> {
    match config.provider.as_str() {
        "bedrock" => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                Error::Config(
                    "bedrock requires an API key (set AWS_BEARER_TOKEN_BEDROCK or model.api_key)"
                        .into(),
                )
            })?;
            Ok(Box::new(bedrock::BedrockClient::new(
                config.model_id.clone(),
                config.region.clone(),
                api_key,
                config.api_url.clone(),
            )))
        }
        "anthropic" => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                Error::Config(
                    "anthropic requires an API key (set ANTHROPIC_API_KEY or model.api_key)".into(),
                )
            })?;
            Ok(Box::new(anthropic::AnthropicClient::new(
                config.model_id.clone(),
                api_key,
                config.api_url.clone(),
            )))
        }
        other => Err(Error::Config(format!(
            "unknown model provider: {other}. Supported: bedrock, anthropic"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_tool_uses_keeps_text_in_order() {
        let mut message = Message {
            role: Role::Assistant,
            content: vec![
                ContentBlock::Text { text: "a".into() },
                ContentBlock::ToolUse {
                    id: "t1".into(),
                    name: "search_memory".into(),
                    input: serde_json::json!({"query": "x"}),
                },
                ContentBlock::Text { text: "b".into() },
            ],
        };
        assert_eq!(message.strip_tool_uses(), 1);
        assert_eq!(message.text(), "ab");
        assert_eq!(message.tool_uses().count(), 0);
        assert_eq!(message.strip_tool_uses(), 0);
    }

    #[test]
    fn stop_reason_vocabulary() {
        assert_eq!(StopReason::from_wire("tool_use"), StopReason::ToolUse);
        assert_eq!(StopReason::from_wire("end_turn"), StopReason::EndTurn);
        assert_eq!(StopReason::from_wire("max_tokens"), StopReason::MaxTokens);
        assert_eq!(
            StopReason::from_wire("guardrail_intervened"),
            StopReason::Other("guardrail_intervened".into())
        );
    }

    #[test]
    fn message_text_skips_tool_blocks() {
        let message = Message {
            role: Role::Assistant,
            content: vec![
                ContentBlock::Text { text: "Let me check. ".into() },
                ContentBlock::ToolUse {
                    id: "t1".into(),
                    name: "search_memory".into(),
                    input: serde_json::json!({"query": "allergy"}),
                },
                ContentBlock::Text { text: "Done".into() },
            ],
        };
        assert_eq!(message.text(), "Let me check. Done");
        let uses: Vec<_> = message.tool_uses().collect();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].id, "t1");
        assert_eq!(uses[0].name, "search_memory");
    }

    #[test]
    fn unknown_provider_is_config_error() {
        let config = ModelConfig {
            provider: "openai".into(),
            ..ModelConfig::default()
        };
        let err = build_model_client(&config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_key_is_config_error() {
        let config = ModelConfig {
            provider: "anthropic".into(),
            api_key: None,
            ..ModelConfig::default()
        };
        assert!(matches!(build_model_client(&config), Err(Error::Config(_))));
    }

    #[test]
    fn builds_bedrock_client_with_key() {
        let config = ModelConfig {
            api_key: Some("bedrock-key".into()),
            ..ModelConfig::default()
        };
        let client = build_model_client(&config).unwrap();
        assert_eq!(client.model_name(), "us.amazon.nova-lite-v1:0");
    }
}
