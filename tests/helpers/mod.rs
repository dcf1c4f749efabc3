#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};

use hippo::config::{CurateDefaults, SearchDefaults};
use hippo::model::{ContentBlock, Message, ModelClient, ModelRequest, ModelResponse, Role, StopReason};
use hippo::service::HippocampusClient;
use hippo::tools::{ToolKind, Toolbox};
use hippo::{Error, Result};

/// What the orchestrator sent on one model call.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Model double that replays canned responses in order and records every request.
pub struct ScriptedModel {
    script: Mutex<VecDeque<ModelResponse>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<ModelResponse>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Arc::default(),
        }
    }

    /// Handle onto the recorded requests; grab it before moving the model.
    pub fn requests(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn converse(&self, request: ModelRequest<'_>) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            system: request.system.to_string(),
            messages: request.messages.to_vec(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Model("script exhausted".into()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Assistant turn requesting the given tools.
pub fn tool_request(calls: &[(&str, &str, Value)]) -> ModelResponse {
    let content = calls
        .iter()
        .map(|(id, name, input)| ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input: input.clone(),
        })
        .collect();
    ModelResponse {
        message: Message {
            role: Role::Assistant,
            content,
        },
        stop_reason: StopReason::ToolUse,
        usage: None,
    }
}

/// Final assistant turn.
pub fn final_text(text: &str) -> ModelResponse {
    ModelResponse {
        message: Message::assistant_text(text),
        stop_reason: StopReason::EndTurn,
        usage: None,
    }
}

/// One request received by a [`StubServer`].
#[derive(Debug, Clone)]
pub struct Received {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Clone, Default)]
struct StubState {
    received: Arc<Mutex<Vec<Received>>>,
    queued: Arc<Mutex<HashMap<String, VecDeque<(u16, String)>>>>,
    fixed: Arc<Mutex<HashMap<String, (u16, String)>>>,
}

/// HTTP server on a random local port that records POSTs and answers from
/// canned replies. Unknown paths get `404`.
pub struct StubServer {
    pub base_url: String,
    state: StubState,
}

impl StubServer {
    pub async fn start() -> Self {
        let state = StubState::default();
        let router = Router::new()
            .route("/{*path}", post(handle))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// A memory service stand-in with healthy defaults for all three endpoints.
    pub async fn memory_service() -> Self {
        let server = Self::start().await;
        server.always("/insert", 200, json!({"message": "Memory inserted"}));
        server.always("/search", 200, json!({"data": []}));
        server.always(
            "/agent-curate",
            200,
            json!({"data": {"memories_created": 0, "memories": []}}),
        );
        server
    }

    /// Answer every request to `path` with `body`.
    pub fn always(&self, path: &str, status: u16, body: Value) {
        self.always_raw(path, status, &body.to_string());
    }

    pub fn always_raw(&self, path: &str, status: u16, body: &str) {
        self.state
            .fixed
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
    }

    /// Answer the next request to `path` with `body`, ahead of the fixed reply.
    pub fn once(&self, path: &str, status: u16, body: Value) {
        self.state
            .queued
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back((status, body.to_string()));
    }

    pub fn received(&self) -> Vec<Received> {
        self.state.received.lock().unwrap().clone()
    }

    pub fn bodies(&self, path: &str) -> Vec<Value> {
        self.received()
            .into_iter()
            .filter(|r| r.path == path)
            .map(|r| r.body)
            .collect()
    }

    pub fn client(&self, agent_id: &str) -> HippocampusClient {
        HippocampusClient::new(&self.base_url, agent_id)
    }

    pub fn toolbox(&self, agent_id: &str, kinds: &[ToolKind]) -> Toolbox {
        Toolbox::new(
            self.client(agent_id),
            kinds,
            SearchDefaults::default(),
            CurateDefaults::default(),
        )
    }
}

async fn handle(
    State(state): State<StubState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let path = uri.path().to_string();
    state.received.lock().unwrap().push(Received {
        path: path.clone(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let queued = state
        .queued
        .lock()
        .unwrap()
        .get_mut(&path)
        .and_then(VecDeque::pop_front);
    let (status, body) = queued
        .or_else(|| state.fixed.lock().unwrap().get(&path).cloned())
        .unwrap_or((404, String::new()));
    (StatusCode::from_u16(status).unwrap(), body)
}
