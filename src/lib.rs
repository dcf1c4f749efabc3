//! Tool-calling agent client for the Hippocampus memory service.
//!
//! A hosted language model is given a small catalog of memory tools. When it
//! asks for one, the call is executed against the remote service and the
//! result is handed back, until the model produces a final answer. The service
//! exposes three operations:
//!
//! | Endpoint | Tool(s) | Purpose |
//! |----------|---------|---------|
//! | `/insert` | `insert_memory`, `log_interaction` | Store one keyed text |
//! | `/search` | `search_memory`, `search_knowledge_base` | Similarity search with `epsilon`, `threshold`, `top_k` |
//! | `/agent-curate` | `agent_curate` | Let the service's own agent split text into memories |
//!
//! # Architecture
//!
//! - **Models**: Anthropic Messages API or Amazon Bedrock Converse, behind [`model::ModelClient`]
//! - **Loop**: [`orchestrator::Orchestrator::chat`] pairs every tool request with its result
//! - **Tools**: [`tools::ToolCall`] resolves the model's arguments into typed records
//! - **Benchmark**: local ONNX embeddings in an exact flat index against the remote service
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`service`]: HTTP client for the memory service
//! - [`model`]: Transcript types and hosted model backends
//! - [`tools`]: Tool catalog, argument records, and dispatch
//! - [`orchestrator`]: The tool-use loop
//! - [`scenarios`]: Scripted demos and interactive mode
//! - [`embedding`]: Text-to-vector embedding via ONNX Runtime
//! - [`bench`]: Latency benchmark

pub mod bench;
pub mod config;
pub mod embedding;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod scenarios;
pub mod service;
pub mod tools;

pub use error::{Error, Result};
