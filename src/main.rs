mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cli::Mode;
use hippo::config::HippoConfig;
use hippo::scenarios;

#[derive(Parser)]
#[command(name = "hippo", version, about = "Tool-calling agents backed by the Hippocampus memory service")]
struct Cli {
    /// Config file (default: ~/.hippo/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip Enter prompts and pauses between demo sessions
    #[arg(long, global = true)]
    no_wait: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Family safety: recall a child's allergy in a later session
    Safety(ModeArgs),
    /// Customer support over a knowledge base
    Support {
        #[command(flatten)]
        mode: ModeArgs,
        /// Load the bundled knowledge base into the service
        #[arg(long, conflicts_with_all = ["demo", "interactive"])]
        populate: bool,
    },
    /// Agent-to-agent curation of a long biography
    Curate(ModeArgs),
    /// Compare a local exact index with the remote service
    Bench {
        /// Number of sample texts to index
        #[arg(long, default_value_t = hippo::bench::DEFAULT_SCALE)]
        scale: usize,
        /// Also time /insert and /search against the service
        #[arg(long)]
        remote: bool,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Args)]
struct ModeArgs {
    /// Run the scripted demo
    #[arg(long, conflicts_with = "interactive")]
    demo: bool,
    /// Chat line by line until 'quit'
    #[arg(long)]
    interactive: bool,
}

impl ModeArgs {
    /// The selected mode, or `fallback` when no flag was given.
    fn or(&self, fallback: Mode) -> Mode {
        if self.interactive {
            Mode::Interactive
        } else if self.demo {
            Mode::Demo
        } else {
            fallback
        }
    }
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.hippo/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => HippoConfig::load_from(path)?,
        None => HippoConfig::load()?,
    };

    // stdout carries the demo transcript
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let pacing = cli::pacing(cli.no_wait);

    match cli.command {
        Command::Safety(mode) => {
            cli::run_scenario(&config, &scenarios::safety::SCENARIO, mode.or(Mode::Demo), pacing)
                .await?;
        }
        Command::Support { mode, populate } => {
            let mode = if populate {
                Mode::Populate
            } else {
                mode.or(Mode::PopulateThenDemo)
            };
            cli::run_scenario(&config, &scenarios::support::SCENARIO, mode, pacing).await?;
        }
        Command::Curate(mode) => {
            cli::run_scenario(&config, &scenarios::curate::SCENARIO, mode.or(Mode::Demo), pacing)
                .await?;
        }
        Command::Bench { scale, remote } => {
            cli::bench::run(&config, scale, remote).await?;
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(())
}
