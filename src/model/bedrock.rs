//! Amazon Bedrock Converse API backend.
//!
//! Authenticates with a Bedrock API key sent as a bearer token, so no request
//! signing is needed. Tool results are sent as `{"json": ...}` content when the
//! result is a JSON object and as `{"text": ...}` otherwise.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ContentBlock, Message, ModelClient, ModelRequest, ModelResponse, Role, StopReason, TokenUsage,
    ToolSpec,
};
use crate::error::{Error, Result};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConverseRequest {
    messages: Vec<BedrockMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<SystemBlock>,
    inference_config: InferenceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
}

#[derive(Serialize)]
struct SystemBlock {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InferenceConfig {
    max_tokens: u32,
}

#[derive(Serialize)]
struct ToolConfig {
    tools: Vec<BedrockTool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BedrockTool {
    tool_spec: BedrockToolSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BedrockToolSpec {
    name: String,
    description: String,
    input_schema: InputSchema,
}

#[derive(Serialize)]
struct InputSchema {
    json: Value,
}

#[derive(Serialize, Deserialize, Debug)]
struct BedrockMessage {
    role: String,
    content: Vec<BedrockBlock>,
}

/// Converse content blocks are objects with exactly one populated member.
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct BedrockBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_use: Option<BedrockToolUse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_result: Option<BedrockToolResult>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BedrockToolUse {
    tool_use_id: String,
    name: String,
    input: Value,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct BedrockToolResult {
    tool_use_id: String,
    content: Vec<ToolResultContent>,
    status: String,
}

#[derive(Serialize, Deserialize, Debug)]
struct ToolResultContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    json: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseResponse {
    output: ConverseOutput,
    stop_reason: String,
    usage: Option<ConverseUsage>,
}

#[derive(Deserialize)]
struct ConverseOutput {
    message: BedrockMessage,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConverseUsage {
    input_tokens: u32,
    output_tokens: u32,
}

pub struct BedrockClient {
    model_id: String,
    endpoint: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl BedrockClient {
    pub fn new(model_id: String, region: String, api_key: String, api_url: Option<String>) -> Self {
        let base = api_url
            .unwrap_or_else(|| format!("https://bedrock-runtime.{region}.amazonaws.com"))
            .trim_end_matches('/')
            .to_string();
        // inference profile ids contain ':' which must be escaped in the path
        let endpoint = format!("{base}/model/{}/converse", model_id.replace(':', "%3A"));
        Self {
            model_id,
            endpoint,
            api_key,
            http_client: reqwest::Client::new(),
        }
    }

    fn to_wire(message: &Message) -> BedrockMessage {
        let content = message
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => BedrockBlock {
                    text: Some(text.clone()),
                    ..Default::default()
                },
                ContentBlock::ToolUse { id, name, input } => BedrockBlock {
                    tool_use: Some(BedrockToolUse {
                        tool_use_id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    }),
                    ..Default::default()
                },
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => {
                    let content = if content.is_object() {
                        ToolResultContent {
                            json: Some(content.clone()),
                            text: None,
                        }
                    } else {
                        ToolResultContent {
                            json: None,
                            text: Some(content.to_string()),
                        }
                    };
                    BedrockBlock {
                        tool_result: Some(BedrockToolResult {
                            tool_use_id: tool_use_id.clone(),
                            content: vec![content],
                            status: if *is_error { "error" } else { "success" }.to_string(),
                        }),
                        ..Default::default()
                    }
                }
            })
            .collect();

        BedrockMessage {
            role: message.role.as_str().to_string(),
            content,
        }
    }

    fn from_wire(message: BedrockMessage) -> Message {
        let content = message
            .content
            .into_iter()
            .filter_map(|block| {
                if let Some(tool_use) = block.tool_use {
                    Some(ContentBlock::ToolUse {
                        id: tool_use.tool_use_id,
                        name: tool_use.name,
                        input: tool_use.input,
                    })
                } else {
                    block.text.map(|text| ContentBlock::Text { text })
                }
            })
            .collect();

        Message {
            role: Role::Assistant,
            content,
        }
    }

    fn tool_config(tools: &[ToolSpec]) -> Option<ToolConfig> {
        if tools.is_empty() {
            return None;
        }
        Some(ToolConfig {
            tools: tools
                .iter()
                .map(|tool| BedrockTool {
                    tool_spec: BedrockToolSpec {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        input_schema: InputSchema {
                            json: tool.input_schema.clone(),
                        },
                    },
                })
                .collect(),
        })
    }

    fn build_request_body(request: &ModelRequest<'_>) -> ConverseRequest {
        let system = if request.system.is_empty() {
            Vec::new()
        } else {
            vec![SystemBlock {
                text: request.system.to_string(),
            }]
        };

        ConverseRequest {
            messages: request.messages.iter().map(Self::to_wire).collect(),
            system,
            inference_config: InferenceConfig {
                max_tokens: request.max_tokens,
            },
            tool_config: Self::tool_config(request.tools),
        }
    }

    fn parse_response(response: ConverseResponse) -> ModelResponse {
        ModelResponse {
            message: Self::from_wire(response.output.message),
            stop_reason: StopReason::from_wire(&response.stop_reason),
            usage: response.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        }
    }
}

#[async_trait]
impl ModelClient for BedrockClient {
    async fn converse(&self, request: ModelRequest<'_>) -> Result<ModelResponse> {
        let body = Self::build_request_body(&request);

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!(
                "Bedrock Converse error {status}: {body_text}"
            )));
        }

        let converse_response: ConverseResponse = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("failed to parse Converse response: {e}")))?;

        let parsed = Self::parse_response(converse_response);
        tracing::debug!(
            model = %self.model_id,
            stop_reason = ?parsed.stop_reason,
            blocks = parsed.message.content.len(),
            "bedrock response"
        );
        Ok(parsed)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_escapes_inference_profile_id() {
        let client = BedrockClient::new(
            "us.amazon.nova-lite-v1:0".into(),
            "us-east-1".into(),
            "key".into(),
            None,
        );
        assert_eq!(
            client.endpoint,
            "https://bedrock-runtime.us-east-1.amazonaws.com/model/us.amazon.nova-lite-v1%3A0/converse"
        );
    }

    #[test]
    fn request_body_matches_converse_format() {
        let messages = vec![
            Message::user_text("My daughter has a shellfish allergy."),
            Message {
                role: Role::Assistant,
                content: vec![ContentBlock::ToolUse {
                    id: "tooluse_a".into(),
                    name: "insert_memory".into(),
                    input: json!({"key": "emma_allergy", "text": "shellfish"}),
                }],
            },
            Message {
                role: Role::User,
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: "tooluse_a".into(),
                    content: json!({"error": "memory service error (500): boom"}),
                    is_error: true,
                }],
            },
        ];
        let tools = vec![ToolSpec {
            name: "insert_memory".into(),
            description: "Store information".into(),
            input_schema: json!({"type": "object", "required": ["key", "text"]}),
        }];
        let request = ModelRequest {
            system: "You have memory.",
            messages: &messages,
            tools: &tools,
            max_tokens: 1024,
        };

        let json = serde_json::to_value(BedrockClient::build_request_body(&request)).unwrap();

        assert_eq!(json["system"][0]["text"], "You have memory.");
        assert_eq!(json["inferenceConfig"]["maxTokens"], 1024);
        assert_eq!(json["toolConfig"]["tools"][0]["toolSpec"]["name"], "insert_memory");
        assert_eq!(
            json["toolConfig"]["tools"][0]["toolSpec"]["inputSchema"]["json"]["required"][0],
            "key"
        );
        assert_eq!(json["messages"][0]["content"][0]["text"], "My daughter has a shellfish allergy.");
        assert_eq!(json["messages"][1]["content"][0]["toolUse"]["toolUseId"], "tooluse_a");
        let result = &json["messages"][2]["content"][0]["toolResult"];
        assert_eq!(result["toolUseId"], "tooluse_a");
        assert_eq!(result["status"], "error");
        assert!(result["content"][0]["json"]["error"].is_string());
        assert!(json["messages"][0]["content"][0].get("toolUse").is_none());
    }

    #[test]
    fn no_tools_omits_tool_config() {
        let messages = vec![Message::user_text("hello")];
        let request = ModelRequest {
            system: "",
            messages: &messages,
            tools: &[],
            max_tokens: 10,
        };
        let json = serde_json::to_value(BedrockClient::build_request_body(&request)).unwrap();
        assert!(json.get("toolConfig").is_none());
        assert!(json.get("system").is_none());
    }

    #[test]
    fn parses_converse_tool_use_response() {
        let raw = json!({
            "output": {"message": {"role": "assistant", "content": [
                {"text": "Let me check your family notes."},
                {"toolUse": {"toolUseId": "tooluse_b", "name": "search_memory",
                             "input": {"query": "Emma allergy", "threshold": 0.7}}}
            ]}},
            "stopReason": "tool_use",
            "usage": {"inputTokens": 100, "outputTokens": 20, "totalTokens": 120},
            "metrics": {"latencyMs": 300}
        });
        let response: ConverseResponse = serde_json::from_value(raw).unwrap();
        let parsed = BedrockClient::parse_response(response);

        assert_eq!(parsed.stop_reason, StopReason::ToolUse);
        assert_eq!(parsed.message.text(), "Let me check your family notes.");
        let uses: Vec<_> = parsed.message.tool_uses().collect();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].id, "tooluse_b");
        assert_eq!(uses[0].name, "search_memory");
        assert_eq!(parsed.usage.unwrap().input_tokens, 100);
    }
}
