//! Error types shared by the service client, model backends, and orchestrator.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The HTTP layer failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The memory service answered with a non-2xx status or an `error` field.
    #[error("memory service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// The hosted model rejected the request or returned something unusable.
    #[error("model error: {0}")]
    Model(String),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// The model kept requesting tools past the configured round limit.
    #[error("model requested tools for {0} consecutive rounds without answering")]
    ToolLoopLimit(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
