use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ContentBlock, Message, ModelClient, ModelRequest, ModelResponse, Role, StopReason, TokenUsage,
    ToolSpec,
};
use crate::error::{Error, Result};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "is_blank")]
    system: &'a str,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSpec],
}

fn is_blank(system: &&str) -> bool {
    system.is_empty()
}

fn no_tools(tools: &&[ToolSpec]) -> bool {
    tools.is_empty()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicBlock>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

pub struct AnthropicClient {
    model: String,
    api_key: String,
    api_url: String,
    http_client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(model: String, api_key: String, api_url: Option<String>) -> Self {
        Self {
            model,
            api_key,
            api_url: api_url
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    fn to_wire(message: &Message) -> AnthropicMessage {
        let content = message
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => AnthropicBlock::Text { text: text.clone() },
                ContentBlock::ToolUse { id, name, input } => AnthropicBlock::ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                },
                // tool_result content must be a string or a list of blocks
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => AnthropicBlock::ToolResult {
                    tool_use_id: tool_use_id.clone(),
                    content: content.to_string(),
                    is_error: *is_error,
                },
            })
            .collect();

        AnthropicMessage {
            role: message.role.as_str().to_string(),
            content,
        }
    }

    fn from_wire(blocks: Vec<AnthropicBlock>) -> Vec<ContentBlock> {
        blocks
            .into_iter()
            .filter_map(|block| match block {
                AnthropicBlock::Text { text } => Some(ContentBlock::Text { text }),
                AnthropicBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                AnthropicBlock::ToolResult { .. } | AnthropicBlock::Unsupported => None,
            })
            .collect()
    }

    fn build_request_body<'a>(&'a self, request: &ModelRequest<'a>) -> AnthropicRequest<'a> {
        AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system: request.system,
            messages: request.messages.iter().map(Self::to_wire).collect(),
            tools: request.tools,
        }
    }

    fn parse_response(response: AnthropicResponse) -> ModelResponse {
        ModelResponse {
            message: Message {
                role: Role::Assistant,
                content: Self::from_wire(response.content),
            },
            stop_reason: StopReason::from_wire(response.stop_reason.as_deref().unwrap_or("end_turn")),
            usage: response.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        }
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn converse(&self, request: ModelRequest<'_>) -> Result<ModelResponse> {
        let body = self.build_request_body(&request);

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.api_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!(
                "Anthropic API error {status}: {body_text}"
            )));
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("failed to parse Anthropic response: {e}")))?;

        let parsed = Self::parse_response(anthropic_response);
        if let Some(usage) = parsed.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = ?parsed.stop_reason,
                "anthropic response"
            );
        }
        Ok(parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> AnthropicClient {
        AnthropicClient::new(
            "claude-sonnet-4-20250514".to_string(),
            "sk-ant-test".to_string(),
            None,
        )
    }

    #[test]
    fn request_body_matches_anthropic_format() {
        let client = client();
        let messages = vec![
            Message::user_text("Is shrimp safe for Emma?"),
            Message {
                role: Role::Assistant,
                content: vec![ContentBlock::ToolUse {
                    id: "toolu_01".into(),
                    name: "search_memory".into(),
                    input: json!({"query": "Emma allergy"}),
                }],
            },
            Message {
                role: Role::User,
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: "toolu_01".into(),
                    content: json!({"found": true}),
                    is_error: false,
                }],
            },
        ];
        let tools = vec![ToolSpec {
            name: "search_memory".into(),
            description: "Search".into(),
            input_schema: json!({"type": "object"}),
        }];
        let request = ModelRequest {
            system: "Be careful.",
            messages: &messages,
            tools: &tools,
            max_tokens: 512,
        };

        let json = serde_json::to_value(client.build_request_body(&request)).unwrap();

        assert_eq!(json["model"], "claude-sonnet-4-20250514");
        assert_eq!(json["system"], "Be careful.");
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["tools"][0]["name"], "search_memory");
        assert_eq!(json["tools"][0]["input_schema"]["type"], "object");

        let wire = json["messages"].as_array().unwrap();
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0]["content"][0]["type"], "text");
        assert_eq!(wire[1]["content"][0]["type"], "tool_use");
        assert_eq!(wire[1]["content"][0]["id"], "toolu_01");
        assert_eq!(wire[2]["role"], "user");
        assert_eq!(wire[2]["content"][0]["type"], "tool_result");
        assert_eq!(wire[2]["content"][0]["tool_use_id"], "toolu_01");
        assert_eq!(wire[2]["content"][0]["content"], "{\"found\":true}");
    }

    #[test]
    fn empty_system_and_tools_are_omitted() {
        let client = client();
        let messages = vec![Message::user_text("hi")];
        let request = ModelRequest {
            system: "",
            messages: &messages,
            tools: &[],
            max_tokens: 64,
        };
        let json = serde_json::to_value(client.build_request_body(&request)).unwrap();
        assert!(json.get("system").is_none());
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn parses_tool_use_response() {
        let raw = json!({
            "id": "msg_01",
            "model": "claude-sonnet-4-20250514",
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Checking memory."},
                {"type": "tool_use", "id": "toolu_02", "name": "insert_memory",
                 "input": {"key": "emma_allergy", "text": "Shellfish"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 7}
        });
        let response: AnthropicResponse = serde_json::from_value(raw).unwrap();
        let parsed = AnthropicClient::parse_response(response);

        assert_eq!(parsed.stop_reason, StopReason::ToolUse);
        assert_eq!(parsed.message.content.len(), 2);
        assert_eq!(parsed.message.text(), "Checking memory.");
        let uses: Vec<_> = parsed.message.tool_uses().collect();
        assert_eq!(uses[0].id, "toolu_02");
        assert_eq!(uses[0].input["key"], "emma_allergy");
        assert_eq!(parsed.usage.unwrap().output_tokens, 7);
    }
}
