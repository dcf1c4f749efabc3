//! Demo scenarios.
//!
//! A scenario is a system prompt, a subset of the tool catalog, and the agent
//! id its memories live under. Each one has a scripted demo and can be driven
//! line by line through [`interactive::run`].

pub mod curate;
pub mod interactive;
pub mod safety;
pub mod support;

use std::io::{self, Write};
use std::time::Duration;

use crate::config::HippoConfig;
use crate::model::ModelClient;
use crate::orchestrator::{Orchestrator, ToolCallRecord};
use crate::service::HippocampusClient;
use crate::tools::{ToolKind, Toolbox};

pub const DIVIDER_WIDTH: usize = 70;

#[derive(Debug)]
pub struct Scenario {
    pub name: &'static str,
    pub title: &'static str,
    /// Memory namespace used unless `service.agent_id` overrides it.
    pub agent_id: &'static str,
    pub system_prompt: &'static str,
    pub tools: &'static [ToolKind],
    /// How the assistant is labelled in interactive mode.
    pub reply_label: &'static str,
    pub farewell: &'static str,
}

impl Scenario {
    pub fn client(&self, config: &HippoConfig) -> HippocampusClient {
        HippocampusClient::new(
            &config.service.base_url,
            config.service.agent_id_or(self.agent_id),
        )
    }

    pub fn toolbox(&self, config: &HippoConfig) -> Toolbox {
        Toolbox::new(self.client(config), self.tools, config.search, config.curate.clone())
    }

    pub fn orchestrator<M: ModelClient>(&self, model: M, config: &HippoConfig) -> Orchestrator<M> {
        Orchestrator::new(model, self.toolbox(config), self.system_prompt)
            .with_max_tokens(config.model.max_tokens)
            .with_max_tool_rounds(config.model.max_tool_rounds)
    }
}

pub const ALL: [&Scenario; 3] = [&safety::SCENARIO, &support::SCENARIO, &curate::SCENARIO];

pub fn by_name(name: &str) -> Option<&'static Scenario> {
    ALL.into_iter().find(|s| s.name == name)
}

/// Whether scripted demos stop for Enter and sleep between sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub wait: bool,
}

impl Pacing {
    pub const LIVE: Pacing = Pacing { wait: true };
    pub const NONE: Pacing = Pacing { wait: false };

    pub async fn sleep(&self, duration: Duration) {
        if self.wait {
            tokio::time::sleep(duration).await;
        }
    }

    /// Print `prompt` and block until a line arrives on stdin.
    pub fn wait_for_enter<W: Write>(&self, out: &mut W, prompt: &str) -> io::Result<()> {
        if !self.wait {
            return Ok(());
        }
        write!(out, "\n{prompt}")?;
        out.flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(())
    }
}

pub fn divider<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(DIVIDER_WIDTH))
}

pub fn banner<W: Write>(out: &mut W, title: &str) -> io::Result<()> {
    writeln!(out)?;
    divider(out)?;
    writeln!(out, "{title}")?;
    divider(out)
}

/// One line per call: `   - name: {input}`.
pub fn print_tool_calls<W: Write>(out: &mut W, calls: &[ToolCallRecord]) -> io::Result<()> {
    writeln!(out, "\n Tools Used:")?;
    if calls.is_empty() {
        writeln!(out, "   (none)")?;
    }
    for call in calls {
        let marker = if call.is_error { " [failed]" } else { "" };
        writeln!(out, "   - {}: {}{marker}", call.name, call.input)?;
    }
    Ok(())
}

/// Shorten `text` to at most `max` characters, appending `...` when cut.
pub fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
