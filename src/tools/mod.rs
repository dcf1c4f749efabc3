//! Tool catalog and dispatch.
//!
//! The model names a tool and hands over a JSON argument map. [`ToolCall::parse`]
//! resolves that pair into one strongly typed variant, and [`Toolbox::dispatch`]
//! executes it against the memory service. Every outcome, including failures,
//! comes back as a JSON object so it can be fed to the model as a tool result.

pub mod agent_curate;
pub mod insert_memory;
pub mod search_memory;

use agent_curate::AgentCurateParams;
use insert_memory::{InsertMemoryParams, LogInteractionParams};
use schemars::JsonSchema;
use search_memory::SearchParams;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{CurateDefaults, SearchDefaults};
use crate::model::{ToolSpec, ToolUseRef};
use crate::service::{CurateRequest, HippocampusClient};

/// Number of curated memories echoed back to the model.
const CURATE_SAMPLE_SIZE: usize = 5;

/// The fixed set of tools any scenario can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    InsertMemory,
    LogInteraction,
    SearchMemory,
    SearchKnowledgeBase,
    AgentCurate,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        Self::InsertMemory,
        Self::LogInteraction,
        Self::SearchMemory,
        Self::SearchKnowledgeBase,
        Self::AgentCurate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::InsertMemory => "insert_memory",
            Self::LogInteraction => "log_interaction",
            Self::SearchMemory => "search_memory",
            Self::SearchKnowledgeBase => "search_knowledge_base",
            Self::AgentCurate => "agent_curate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::InsertMemory => "Store important information for later retrieval.",
            Self::LogInteraction => {
                "Log this support interaction for future reference and learning."
            }
            Self::SearchMemory => {
                "Search previously stored information by semantic similarity. Always search \
                 before giving advice about health, food, or activities involving children. \
                 Use a high threshold (0.7+) and low epsilon (0.2) for safety-critical queries."
            }
            Self::SearchKnowledgeBase => {
                "Search the knowledge base for support articles, product docs, and past resolutions."
            }
            Self::AgentCurate => {
                "Send information to the memory service's internal AI agent for curation. \
                 The agent decomposes the text into discrete, searchable memories."
            }
        }
    }

    /// Catalog entry advertised to the model.
    pub fn spec(&self) -> ToolSpec {
        let input_schema = match self {
            Self::InsertMemory => input_schema::<InsertMemoryParams>(),
            Self::LogInteraction => input_schema::<LogInteractionParams>(),
            Self::SearchMemory | Self::SearchKnowledgeBase => input_schema::<SearchParams>(),
            Self::AgentCurate => input_schema::<AgentCurateParams>(),
        };
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema,
        }
    }

    /// Key under which search hits are reported back to the model.
    fn hits_label(&self) -> &'static str {
        match self {
            Self::SearchKnowledgeBase => "articles",
            _ => "memories",
        }
    }
}

/// JSON schema of a parameter record, without the meta-schema header.
fn input_schema<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
    }
    schema
}

/// A tool request resolved to its typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    InsertMemory(InsertMemoryParams),
    LogInteraction(LogInteractionParams),
    SearchMemory(SearchParams),
    SearchKnowledgeBase(SearchParams),
    AgentCurate(AgentCurateParams),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: &'static str, reason: String },
}

impl ToolCall {
    pub fn parse(name: &str, input: &Value) -> Result<Self, ToolCallError> {
        let kind =
            ToolKind::from_name(name).ok_or_else(|| ToolCallError::UnknownTool(name.to_string()))?;

        fn args<T: serde::de::DeserializeOwned>(
            kind: ToolKind,
            input: &Value,
        ) -> Result<T, ToolCallError> {
            T::deserialize(input).map_err(|e| ToolCallError::InvalidArguments {
                tool: kind.name(),
                reason: e.to_string(),
            })
        }

        Ok(match kind {
            ToolKind::InsertMemory => Self::InsertMemory(args(kind, input)?),
            ToolKind::LogInteraction => Self::LogInteraction(args(kind, input)?),
            ToolKind::SearchMemory => Self::SearchMemory(args(kind, input)?),
            ToolKind::SearchKnowledgeBase => Self::SearchKnowledgeBase(args(kind, input)?),
            ToolKind::AgentCurate => Self::AgentCurate(args(kind, input)?),
        })
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::InsertMemory(_) => ToolKind::InsertMemory,
            Self::LogInteraction(_) => ToolKind::LogInteraction,
            Self::SearchMemory(_) => ToolKind::SearchMemory,
            Self::SearchKnowledgeBase(_) => ToolKind::SearchKnowledgeBase,
            Self::AgentCurate(_) => ToolKind::AgentCurate,
        }
    }
}

/// Structured result of one tool execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub content: Value,
    pub is_error: bool,
}

impl ToolOutcome {
    fn ok(content: Value) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    fn error(message: impl std::fmt::Display) -> Self {
        Self {
            content: json!({ "error": message.to_string() }),
            is_error: true,
        }
    }
}

/// Executes tool calls for one scenario against the memory service.
#[derive(Clone)]
pub struct Toolbox {
    client: HippocampusClient,
    kinds: Vec<ToolKind>,
    search: SearchDefaults,
    curate: CurateDefaults,
}

impl Toolbox {
    pub fn new(
        client: HippocampusClient,
        kinds: &[ToolKind],
        search: SearchDefaults,
        curate: CurateDefaults,
    ) -> Self {
        Self {
            client,
            kinds: kinds.to_vec(),
            search,
            curate,
        }
    }

    /// Catalog advertised to the model, in scenario order.
    pub fn catalog(&self) -> Vec<ToolSpec> {
        self.kinds.iter().map(ToolKind::spec).collect()
    }

    /// Run one requested tool. Never fails: unknown tools, bad arguments, and
    /// service failures all come back as `{"error": ...}` outcomes.
    pub async fn dispatch(&self, request: ToolUseRef<'_>) -> ToolOutcome {
        let call = match ToolCall::parse(request.name, request.input) {
            Ok(call) if self.kinds.contains(&call.kind()) => call,
            Ok(_) => return ToolOutcome::error(ToolCallError::UnknownTool(request.name.into())),
            Err(e) => {
                tracing::warn!(tool = request.name, id = request.id, error = %e, "rejected tool call");
                return ToolOutcome::error(e);
            }
        };

        tracing::info!(tool = request.name, id = request.id, "tool call");
        let outcome = self.execute(call).await;
        if outcome.is_error {
            tracing::warn!(tool = request.name, id = request.id, result = %outcome.content, "tool call failed");
        }
        outcome
    }

    async fn execute(&self, call: ToolCall) -> ToolOutcome {
        match call {
            ToolCall::InsertMemory(params) => {
                self.insert(&params.key, &params.text, "Memory stored").await
            }
            ToolCall::LogInteraction(params) => {
                self.insert(&params.key, &params.summary, "Interaction logged successfully")
                    .await
            }
            ToolCall::SearchMemory(params) => self.search(ToolKind::SearchMemory, &params).await,
            ToolCall::SearchKnowledgeBase(params) => {
                self.search(ToolKind::SearchKnowledgeBase, &params).await
            }
            ToolCall::AgentCurate(params) => self.curate(params).await,
        }
    }

    async fn insert(&self, key: &str, text: &str, message: &str) -> ToolOutcome {
        match self.client.insert(key, text).await {
            Ok(_) => ToolOutcome::ok(json!({ "success": true, "message": message })),
            Err(e) => ToolOutcome::error(e),
        }
    }

    async fn search(&self, kind: ToolKind, params: &SearchParams) -> ToolOutcome {
        let resolved = params.resolve(&self.search);
        let request = self.client.search_request(
            &params.query,
            resolved.epsilon,
            resolved.threshold,
            resolved.top_k,
        );

        match self.client.search(&request).await {
            Ok(hits) => {
                let mut content = json!({
                    "found": !hits.is_empty(),
                    "count": hits.len(),
                    "search_params": resolved,
                });
                content[kind.hits_label()] = Value::Array(hits);
                ToolOutcome::ok(content)
            }
            Err(e) => ToolOutcome::error(e),
        }
    }

    async fn curate(&self, params: AgentCurateParams) -> ToolOutcome {
        let request = CurateRequest {
            agent_id: self.client.agent_id().to_string(),
            text: params.text,
            importance: params.importance.to_string(),
            model_id: params.model_id.unwrap_or_else(|| self.curate.model_id.clone()),
            bedrock_region: params
                .bedrock_region
                .unwrap_or_else(|| self.curate.bedrock_region.clone()),
            timeout_ms: params.timeout_ms.unwrap_or(self.curate.timeout_ms),
        };

        match self.client.agent_curate(&request).await {
            Ok(summary) => {
                let sample: Vec<_> = summary
                    .memories
                    .iter()
                    .take(CURATE_SAMPLE_SIZE)
                    .collect();
                ToolOutcome::ok(json!({
                    "memories_created": summary.memories_created,
                    "sample": sample,
                }))
            }
            Err(e) => ToolOutcome::error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolves_known_tools() {
        let call = ToolCall::parse(
            "log_interaction",
            &json!({"key": "ticket_429", "summary": "Explained rate limits"}),
        )
        .unwrap();
        assert_eq!(
            call,
            ToolCall::LogInteraction(LogInteractionParams {
                key: "ticket_429".into(),
                summary: "Explained rate limits".into(),
            })
        );
        assert_eq!(call.kind(), ToolKind::LogInteraction);
    }

    #[test]
    fn parse_rejects_unknown_tool() {
        let err = ToolCall::parse("delete_everything", &json!({})).unwrap_err();
        assert_eq!(err, ToolCallError::UnknownTool("delete_everything".into()));
        assert_eq!(err.to_string(), "Unknown tool: delete_everything");
    }

    #[test]
    fn parse_reports_missing_arguments() {
        let err = ToolCall::parse("insert_memory", &json!({"key": "only_key"})).unwrap_err();
        match err {
            ToolCallError::InvalidArguments { tool, reason } => {
                assert_eq!(tool, "insert_memory");
                assert!(reason.contains("text"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_unknown_importance() {
        let err = ToolCall::parse(
            "agent_curate",
            &json!({"text": "Sarah is 34", "importance": "urgent"}),
        )
        .unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArguments { tool: "agent_curate", .. }));
    }

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn search_schema_requires_only_query() {
        let spec = ToolKind::SearchMemory.spec();
        assert_eq!(spec.name, "search_memory");
        let schema = &spec.input_schema;
        assert!(schema.get("$schema").is_none());
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["query"]));
        for field in ["query", "epsilon", "threshold", "top_k"] {
            assert!(schema["properties"].get(field).is_some(), "missing {field}");
        }
    }

    #[test]
    fn curate_schema_lists_importance_levels() {
        let schema = ToolKind::AgentCurate.spec().input_schema;
        let importance = schema["properties"]["importance"].to_string();
        for level in ["high", "medium", "low"] {
            assert!(importance.contains(level), "{importance}");
        }
        let required = schema["required"].as_array().unwrap();
        assert!(required.contains(&json!("text")));
        assert!(required.contains(&json!("importance")));
        assert!(!required.contains(&json!("model_id")));
    }

    #[tokio::test]
    async fn dispatch_refuses_tools_outside_the_catalog() {
        let toolbox = Toolbox::new(
            HippocampusClient::new("http://127.0.0.1:9", "test"),
            &[ToolKind::SearchKnowledgeBase],
            SearchDefaults::default(),
            CurateDefaults::default(),
        );
        let input = json!({"key": "k", "text": "t"});
        let outcome = toolbox
            .dispatch(ToolUseRef {
                id: "t1",
                name: "insert_memory",
                input: &input,
            })
            .await;
        assert!(outcome.is_error);
        assert_eq!(outcome.content["error"], "Unknown tool: insert_memory");
    }
}
