pub mod bench;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;

use hippo::config::{EmbeddingConfig, HippoConfig};
use hippo::model::build_model_client;
use hippo::scenarios::{self, curate, interactive, safety, support, Pacing, Scenario};

const MODEL_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx";
const TOKENIZER_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json";

/// Pause between loading the knowledge base and starting the support demo.
const POPULATE_SETTLE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Demo,
    Interactive,
    Populate,
    PopulateThenDemo,
}

pub fn pacing(no_wait: bool) -> Pacing {
    if no_wait {
        Pacing::NONE
    } else {
        Pacing::LIVE
    }
}

pub async fn run_scenario(
    config: &HippoConfig,
    scenario: &Scenario,
    mode: Mode,
    pacing: Pacing,
) -> Result<()> {
    let mut out = std::io::stdout();

    if matches!(mode, Mode::Populate | Mode::PopulateThenDemo) {
        populate(config, scenario).await?;
        if mode == Mode::Populate {
            return Ok(());
        }
        pacing.sleep(POPULATE_SETTLE).await;
    }

    let model = build_model_client(&config.model)
        .context("failed to set up the hosted model client")?;
    tracing::info!(
        scenario = scenario.name,
        model = model.model_name(),
        service = %config.service.base_url,
        "starting scenario"
    );
    let orchestrator = scenario.orchestrator(model, config);

    match mode {
        Mode::Interactive => {
            let stdin = std::io::stdin();
            interactive::run(scenario, &orchestrator, stdin.lock(), &mut out).await?;
        }
        _ => match scenario.name {
            "safety" => safety::run_demo(&orchestrator, &config.demo, pacing, &mut out).await?,
            "support" => support::run_demo(&orchestrator, pacing, &mut out).await?,
            "curate" => curate::run_demo(&orchestrator, pacing, &mut out).await?,
            other => anyhow::bail!("scenario {other} has no scripted demo"),
        },
    }
    Ok(())
}

/// Load the support knowledge base into the service.
async fn populate(config: &HippoConfig, scenario: &Scenario) -> Result<()> {
    let client = scenario.client(config);
    let articles = support::ARTICLES;

    println!(
        "\nPopulating knowledge base for agent '{}' with {} support articles...\n",
        client.agent_id(),
        articles.len()
    );

    let pb = ProgressBar::new(articles.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("valid template")
            .progress_chars("##-"),
    );

    let delay = Duration::from_millis(config.demo.populate_delay_ms);
    let summary = support::populate(&client, articles, delay, &pb).await;

    println!("Knowledge base populated: {} articles inserted.", summary.inserted);
    if !summary.failed.is_empty() {
        println!("{} inserts failed:", summary.failed.len());
        for key in &summary.failed {
            println!("  - {key}");
        }
    }
    scenarios::divider(&mut std::io::stdout())?;
    Ok(())
}

/// Download the ONNX embedding model and tokenizer to the cache directory.
pub async fn model_download(config: &EmbeddingConfig) -> Result<()> {
    let cache_dir = hippo::config::expand_tilde(&config.cache_dir);
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("failed to create cache dir: {}", cache_dir.display()))?;

    for (url, name) in [(MODEL_URL, "model.onnx"), (TOKENIZER_URL, "tokenizer.json")] {
        let dest = cache_dir.join(name);
        if dest.exists() {
            println!("{name} already exists at {}", dest.display());
            continue;
        }
        println!("Downloading {name}...");
        download_file(url, &dest).await?;
        println!("{name} saved to {}", dest.display());
    }

    println!("Model download complete. Ready for `hippo bench`.");
    Ok(())
}

/// Stream `url` into `dest` through a temp file, then rename.
async fn download_file(url: &str, dest: &Path) -> Result<()> {
    let mut response = reqwest::get(url)
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download failed with HTTP {}",
        response.status()
    );

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                    .expect("valid template")
                    .progress_chars("##-"),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let tmp_path = dest.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    while let Some(chunk) = response.chunk().await.context("error reading response")? {
        file.write_all(&chunk).await.context("error writing to file")?;
        pb.inc(chunk.len() as u64);
    }
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    pb.finish_and_clear();
    Ok(())
}
