//! Line-at-a-time chat over one long-lived transcript.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use super::{banner, Scenario};
use crate::model::ModelClient;
use crate::orchestrator::{Orchestrator, Transcript};

/// `quit` or `exit`, ignoring case and surrounding whitespace.
pub fn is_quit(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit")
}

/// Read lines from `input` until quit or EOF, one `chat` per non-empty line.
/// Returns the number of turns sent to the model.
pub async fn run<M: ModelClient, R: BufRead, W: Write>(
    scenario: &Scenario,
    orchestrator: &Orchestrator<M>,
    mut input: R,
    out: &mut W,
) -> Result<usize> {
    banner(out, &format!("INTERACTIVE MODE: {}", scenario.title))?;
    writeln!(out, "\nType 'quit' to exit.\n")?;

    let mut transcript = Transcript::new();
    let mut turns = 0;
    let mut line = String::new();

    loop {
        write!(out, "You: ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line).context("failed to read input")? == 0 {
            writeln!(out)?;
            break;
        }
        if is_quit(&line) {
            writeln!(out, "\n{}", scenario.farewell)?;
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }

        let reply = orchestrator.chat(&mut transcript, message).await?;
        turns += 1;
        writeln!(out, "\n{}: {}\n", scenario.reply_label, reply.text)?;
    }

    tracing::debug!(turns, messages = transcript.len(), "interactive session ended");
    Ok(turns)
}
