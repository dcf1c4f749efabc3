//! The tool-use loop.
//!
//! [`Orchestrator::chat`] appends the user's message, asks the model, and as
//! long as the model stops with `tool_use` it executes every requested tool
//! and answers with one user turn carrying all results. The loop ends on any
//! other stop reason; the final assistant turn is appended, without any tool
//! requests it still carries, and its text returned.
//!
//! Every `tool_use` block that lands in the transcript is followed by exactly
//! one `tool_result` with the same id before the next model call.

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{
    ContentBlock, Message, ModelClient, ModelRequest, Role, StopReason, ToolSpec,
};
use crate::tools::Toolbox;

/// Stands in for an assistant turn that carried nothing but dropped tool requests.
pub const INCOMPLETE_REPLY: &str = "[reply incomplete]";

/// Ordered, append-only conversation history for one run.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// One executed tool call, for display by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub input: Value,
    pub result: Value,
    pub is_error: bool,
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub stop_reason: StopReason,
}

pub struct Orchestrator<M> {
    model: M,
    toolbox: Toolbox,
    system_prompt: String,
    catalog: Vec<ToolSpec>,
    max_tokens: u32,
    max_tool_rounds: usize,
}

impl<M: ModelClient> Orchestrator<M> {
    pub fn new(model: M, toolbox: Toolbox, system_prompt: impl Into<String>) -> Self {
        let catalog = toolbox.catalog();
        Self {
            model,
            toolbox,
            system_prompt: system_prompt.into(),
            catalog,
            max_tokens: 1024,
            max_tool_rounds: 16,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// `0` disables the limit.
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    /// Run one user turn to completion.
    ///
    /// Model failures propagate. Tool failures never do: they are handed to
    /// the model as error results.
    pub async fn chat(&self, transcript: &mut Transcript, user_message: &str) -> Result<ChatReply> {
        transcript.push(Message::user_text(user_message));

        let mut tool_calls = Vec::new();
        let mut rounds = 0usize;

        loop {
            let response = self
                .model
                .converse(ModelRequest {
                    system: &self.system_prompt,
                    messages: transcript.messages(),
                    tools: &self.catalog,
                    max_tokens: self.max_tokens,
                })
                .await?;

            let wants_tools = response.stop_reason == StopReason::ToolUse
                && response.message.tool_uses().next().is_some();

            if !wants_tools {
                let mut message = response.message;
                // tool requests cut off by another stop reason are never answered
                let dropped = message.strip_tool_uses();
                if dropped > 0 {
                    tracing::warn!(
                        dropped,
                        stop_reason = ?response.stop_reason,
                        "discarding unanswered tool requests"
                    );
                }
                if message.content.is_empty() {
                    message = Message::assistant_text(INCOMPLETE_REPLY);
                }
                let text = message.text();
                tracing::info!(
                    rounds,
                    tool_calls = tool_calls.len(),
                    stop_reason = ?response.stop_reason,
                    "chat turn complete"
                );
                transcript.push(message);
                return Ok(ChatReply {
                    text,
                    tool_calls,
                    stop_reason: response.stop_reason,
                });
            }

            let mut results = Vec::new();
            for request in response.message.tool_uses() {
                let outcome = self.toolbox.dispatch(request).await;
                tool_calls.push(ToolCallRecord {
                    id: request.id.to_string(),
                    name: request.name.to_string(),
                    input: request.input.clone(),
                    result: outcome.content.clone(),
                    is_error: outcome.is_error,
                });
                results.push(ContentBlock::ToolResult {
                    tool_use_id: request.id.to_string(),
                    content: outcome.content,
                    is_error: outcome.is_error,
                });
            }

            transcript.push(response.message);
            transcript.push(Message {
                role: Role::User,
                content: results,
            });

            rounds += 1;
            if self.max_tool_rounds > 0 && rounds >= self.max_tool_rounds {
                return Err(Error::ToolLoopLimit(rounds));
            }
        }
    }
}
