use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};

use hippo::bench::{self, BenchReport, SEARCH_K, SEARCH_QUERIES};
use hippo::config::HippoConfig;
use hippo::embedding::{self, EmbeddingProvider};
use hippo::service::HippocampusClient;

fn progress(len: usize, label: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {prefix} {bar:40.cyan/blue} {pos}/{len} ({eta})")
            .expect("valid template")
            .progress_chars("##-"),
    );
    pb.set_prefix(label);
    pb
}

/// Run the benchmark and print the summary followed by the machine lines.
pub async fn run(config: &HippoConfig, scale: usize, remote: bool) -> Result<()> {
    anyhow::ensure!(scale > 0, "--scale must be at least 1");

    let started_at = Utc::now();
    let texts = bench::sample_texts(scale);

    let provider: Arc<dyn EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);

    println!("Embedding {scale} texts with {} locally...", config.embedding.model);
    let pb = progress(texts.len(), "local");
    let local = bench::run_local(provider, &texts, &pb).await?;
    pb.finish_and_clear();
    println!(
        "  Embeddings: {:.1}ms avg (total: {:.1}s)",
        local.insert_ms,
        local.embed_total.as_secs_f64()
    );
    println!("Running {} searches (k={SEARCH_K})...", SEARCH_QUERIES.len());
    println!("  Search: {:.1}ms avg", local.search_ms);
    println!("    - Embedding: {:.1}ms avg", local.embed_query_ms);
    println!("    - Pure flat index search: {:.3}ms avg", local.pure_search_ms);

    let remote = if remote {
        let client = HippocampusClient::new(&config.service.base_url, bench::run_agent_id());
        println!(
            "\nTiming /insert and /search at {} as agent '{}'...",
            client.base_url(),
            client.agent_id()
        );
        let pb = progress(texts.len(), "remote");
        let timings = bench::run_remote(&client, &texts, config.search, &pb).await?;
        pb.finish_and_clear();
        println!("  Insert: {:.1}ms avg", timings.insert_ms);
        println!("  Search: {:.1}ms avg", timings.search_ms);
        Some(timings)
    } else {
        None
    };

    let report = BenchReport {
        started_at,
        scale,
        queries: SEARCH_QUERIES.len(),
        local,
        remote,
    };
    tracing::debug!(report = %serde_json::to_string(&report)?, "benchmark finished");

    println!();
    for line in report.machine_lines() {
        println!("{line}");
    }
    Ok(())
}
