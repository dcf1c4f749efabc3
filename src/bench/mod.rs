//! Latency benchmark: an in-process exact index against the remote service.
//!
//! The local side embeds every sample text with the ONNX model and searches a
//! [`FlatIndex`]; the remote side sends the same texts through `/insert` and
//! the same queries through `/search`. Averages are reported in milliseconds.

pub mod flat_index;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use serde::Serialize;

use crate::config::SearchDefaults;
use crate::embedding::EmbeddingProvider;
use crate::service::HippocampusClient;

pub use flat_index::{FlatIndex, Neighbor};

pub const SAMPLE_TEXTS: [&str; 10] = [
    "User prefers dark mode interface variant ",
    "User likes Python programming language variant ",
    "User allergic to shellfish variant ",
    "User enjoys marathon running variant ",
    "User drinks espresso every morning variant ",
    "User lives in Seattle Washington variant ",
    "User works at Amazon Web Services variant ",
    "User has golden retriever named Max variant ",
    "User graduated from MIT computer science variant ",
    "User enjoys landscape photography variant ",
];

pub const SEARCH_QUERIES: [&str; 20] = [
    "UI preferences",
    "programming languages",
    "food allergies",
    "exercise activities",
    "beverages drinks",
    "location city",
    "work job",
    "pets animals",
    "education degree",
    "hobbies interests",
    "favorite foods",
    "travel destinations",
    "books reading",
    "music preferences",
    "fitness routine",
    "languages spoken",
    "musical instruments",
    "dietary restrictions",
    "allergies medical",
    "outdoor activities",
];

/// Neighbours requested per query on both sides.
pub const SEARCH_K: usize = 5;

pub const DEFAULT_SCALE: usize = 100;

/// `scale` texts cycling through [`SAMPLE_TEXTS`], each suffixed with its index.
pub fn sample_texts(scale: usize) -> Vec<String> {
    (0..scale)
        .map(|i| format!("{}{i}", SAMPLE_TEXTS[i % SAMPLE_TEXTS.len()]))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct LocalTimings {
    /// Average time to embed one sample text.
    pub insert_ms: f64,
    /// Average query embed plus search.
    pub search_ms: f64,
    pub embed_query_ms: f64,
    /// Average index search alone.
    pub pure_search_ms: f64,
    pub embed_total: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoteTimings {
    pub agent_id: String,
    pub insert_ms: f64,
    pub search_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub started_at: DateTime<Utc>,
    pub scale: usize,
    pub queries: usize,
    pub local: LocalTimings,
    pub remote: Option<RemoteTimings>,
}

impl BenchReport {
    /// `NAME:<ms>` lines for scripts that scrape the output.
    pub fn machine_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("LOCAL_INSERT:{}", self.local.insert_ms),
            format!("LOCAL_SEARCH:{}", self.local.search_ms),
            format!("LOCAL_PURE_SEARCH:{}", self.local.pure_search_ms),
        ];
        if let Some(remote) = &self.remote {
            lines.push(format!("REMOTE_INSERT:{}", remote.insert_ms));
            lines.push(format!("REMOTE_SEARCH:{}", remote.search_ms));
        }
        lines
    }
}

/// A fresh agent id so repeated runs never search each other's inserts.
pub fn run_agent_id() -> String {
    format!("bench-{}", uuid::Uuid::now_v7())
}

pub fn mean_ms(samples: &[Duration]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let total: f64 = samples.iter().map(|d| d.as_secs_f64()).sum();
    total / samples.len() as f64 * 1000.0
}

async fn embed(provider: &Arc<dyn EmbeddingProvider>, text: String) -> Result<Vec<f32>> {
    let provider = Arc::clone(provider);
    tokio::task::spawn_blocking(move || provider.embed(&text))
        .await
        .context("embedding task failed")?
}

/// Embed `texts` into a flat index, then time [`SEARCH_QUERIES`] against it.
pub async fn run_local(
    provider: Arc<dyn EmbeddingProvider>,
    texts: &[String],
    progress: &ProgressBar,
) -> Result<LocalTimings> {
    let mut index = FlatIndex::new(provider.dimensions());

    let started = Instant::now();
    let mut embed_times = Vec::with_capacity(texts.len());
    for text in texts {
        let t = Instant::now();
        let vector = embed(&provider, text.clone()).await?;
        embed_times.push(t.elapsed());
        index.add(&vector)?;
        progress.inc(1);
    }
    let embed_total = started.elapsed();
    tracing::info!(vectors = index.len(), elapsed = ?embed_total, "local index built");

    let mut query_embed_times = Vec::with_capacity(SEARCH_QUERIES.len());
    let mut pure_search_times = Vec::with_capacity(SEARCH_QUERIES.len());
    let mut search_times = Vec::with_capacity(SEARCH_QUERIES.len());
    for query in SEARCH_QUERIES {
        let t = Instant::now();
        let vector = embed(&provider, query.to_string()).await?;
        let embed_time = t.elapsed();

        let t = Instant::now();
        let hits = index.search(&vector, SEARCH_K)?;
        let search_time = t.elapsed();
        tracing::debug!(query, hits = hits.len(), "local search");

        query_embed_times.push(embed_time);
        pure_search_times.push(search_time);
        search_times.push(embed_time + search_time);
    }

    Ok(LocalTimings {
        insert_ms: mean_ms(&embed_times),
        search_ms: mean_ms(&search_times),
        embed_query_ms: mean_ms(&query_embed_times),
        pure_search_ms: mean_ms(&pure_search_times),
        embed_total,
    })
}

/// Insert `texts` through the service, then time [`SEARCH_QUERIES`] against it.
/// `client` should carry a fresh agent id (see [`run_agent_id`]).
pub async fn run_remote(
    client: &HippocampusClient,
    texts: &[String],
    search: SearchDefaults,
    progress: &ProgressBar,
) -> Result<RemoteTimings> {
    let mut insert_times = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        let key = format!("bench_{i}");
        let t = Instant::now();
        client
            .insert(&key, text)
            .await
            .with_context(|| format!("remote insert of {key} failed"))?;
        insert_times.push(t.elapsed());
        progress.inc(1);
    }

    let mut search_times = Vec::with_capacity(SEARCH_QUERIES.len());
    for query in SEARCH_QUERIES {
        let request =
            client.search_request(query, search.epsilon, search.threshold, SEARCH_K as u32);
        let t = Instant::now();
        let hits = client
            .search(&request)
            .await
            .with_context(|| format!("remote search for {query:?} failed"))?;
        search_times.push(t.elapsed());
        tracing::debug!(query, hits = hits.len(), "remote search");
    }

    Ok(RemoteTimings {
        agent_id: client.agent_id().to_string(),
        insert_ms: mean_ms(&insert_times),
        search_ms: mean_ms(&search_times),
    })
}
