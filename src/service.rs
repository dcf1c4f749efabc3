//! HTTP client for the Hippocampus memory service.
//!
//! Every endpoint is a JSON `POST` answered with an envelope of the form
//! `{"message": ..., "status": ..., "data": ..., "error": ...}`. A non-2xx
//! status, an `error` field, or `"status": "error"` all surface as
//! [`Error::Service`]. Failures below HTTP surface as [`Error::Transport`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Body of `POST /insert`.
#[derive(Debug, Serialize)]
struct InsertRequest<'a> {
    agent_id: &'a str,
    key: &'a str,
    text: &'a str,
}

/// Body of `POST /search`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchRequest {
    pub agent_id: String,
    pub text: String,
    pub epsilon: f64,
    pub threshold: f64,
    pub top_k: u32,
}

/// Body of `POST /agent-curate`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CurateRequest {
    pub agent_id: String,
    pub text: String,
    pub importance: String,
    pub model_id: String,
    pub bedrock_region: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    message: Option<String>,
    status: Option<Value>,
    data: Option<Value>,
    error: Option<String>,
}

/// Successful service response with the envelope unwrapped.
#[derive(Debug, Clone)]
pub struct ServiceReply {
    pub message: Option<String>,
    /// `Value::Null` when the service sent no `data`.
    pub data: Value,
}

/// One memory created by the service-side curation agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CuratedMemory {
    pub key: String,
    pub text: String,
    #[serde(default)]
    pub reasoning: String,
}

/// `data` payload of a successful `/agent-curate` call.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CurateSummary {
    #[serde(default)]
    pub memories_created: usize,
    #[serde(default)]
    pub memories: Vec<CuratedMemory>,
}

#[derive(Clone)]
pub struct HippocampusClient {
    base_url: String,
    agent_id: String,
    http: reqwest::Client,
}

impl HippocampusClient {
    pub fn new(base_url: &str, agent_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent_id: agent_id.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Same service, different memory namespace.
    pub fn with_agent_id(&self, agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            ..self.clone()
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store `text` under `key`.
    pub async fn insert(&self, key: &str, text: &str) -> Result<ServiceReply> {
        tracing::debug!(key, text_len = text.len(), "insert");
        self.post(
            "insert",
            &InsertRequest {
                agent_id: &self.agent_id,
                key,
                text,
            },
        )
        .await
    }

    /// Build a search request in this client's namespace.
    pub fn search_request(&self, text: &str, epsilon: f64, threshold: f64, top_k: u32) -> SearchRequest {
        SearchRequest {
            agent_id: self.agent_id.clone(),
            text: text.to_string(),
            epsilon,
            threshold,
            top_k,
        }
    }

    /// Run a semantic search and return whatever hits the service provides.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Value>> {
        tracing::debug!(
            query = %request.text,
            epsilon = request.epsilon,
            threshold = request.threshold,
            top_k = request.top_k,
            "search"
        );
        let reply = self.post("search", request).await?;
        Ok(match reply.data {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        })
    }

    /// Hand free text to the service-side curation agent.
    pub async fn agent_curate(&self, request: &CurateRequest) -> Result<CurateSummary> {
        tracing::debug!(
            importance = %request.importance,
            model_id = %request.model_id,
            text_len = request.text.len(),
            "agent-curate"
        );
        let reply = self.post("agent-curate", request).await?;
        if reply.data.is_null() {
            return Ok(CurateSummary::default());
        }
        Ok(serde_json::from_value(reply.data)?)
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<ServiceReply> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self.http.post(&url).json(body).send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        let envelope: Option<Envelope> = if bytes.iter().all(u8::is_ascii_whitespace) {
            Some(Envelope::default())
        } else {
            serde_json::from_slice(&bytes).ok()
        };

        if !status.is_success() {
            let message = envelope
                .and_then(|e| e.error.or(e.message))
                .unwrap_or_else(|| {
                    let raw = String::from_utf8_lossy(&bytes).trim().to_string();
                    if raw.is_empty() {
                        status.canonical_reason().unwrap_or("request failed").to_string()
                    } else {
                        raw
                    }
                });
            return Err(Error::Service {
                status: status.as_u16(),
                message,
            });
        }

        let envelope = envelope.ok_or_else(|| Error::Service {
            status: status.as_u16(),
            message: format!("{endpoint} returned a body that is not a JSON envelope"),
        })?;

        if let Some(message) = envelope.error {
            return Err(Error::Service {
                status: status.as_u16(),
                message,
            });
        }

        let status_field = envelope.status.as_ref().and_then(Value::as_str);
        if status_field.is_some_and(|s| s.eq_ignore_ascii_case("error")) {
            return Err(Error::Service {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("{endpoint} reported status error")),
            });
        }

        Ok(ServiceReply {
            message: envelope.message,
            data: envelope.data.unwrap_or(Value::Null),
        })
    }
}
