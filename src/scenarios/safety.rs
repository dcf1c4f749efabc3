//! Family safety: a parent shares a child's allergy, and in a later session
//! the assistant has to recall it unprompted before endorsing a risky plan.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;

use super::{banner, divider, print_tool_calls, Pacing, Scenario};
use crate::config::DemoConfig;
use crate::model::ModelClient;
use crate::orchestrator::{Orchestrator, Transcript};
use crate::tools::ToolKind;

pub const SYSTEM_PROMPT: &str = "\
You are a helpful assistant with access to long-term memory about the user and their family.

CRITICAL: Always check memory before giving advice, especially about:
- Health/medical information
- Allergies and dietary restrictions
- Safety concerns
- Children's needs

When the user mentions doing something, proactively search for relevant safety information.

Search Parameter Guidelines:
- For safety-critical queries (allergies, medical): use high threshold (0.7+), low epsilon (0.2)
- For general family information: use moderate settings (threshold 0.5, epsilon 0.3)
- Adjust top_k based on how comprehensive you need the results";

pub const SCENARIO: Scenario = Scenario {
    name: "safety",
    title: "Hippocampus Safety Demo: Critical Memory Retrieval",
    agent_id: "safety_demo_parent",
    system_prompt: SYSTEM_PROMPT,
    tools: &[ToolKind::InsertMemory, ToolKind::SearchMemory],
    reply_label: "Assistant",
    farewell: "Stay safe!",
};

pub const SHARE_ALLERGY: &str = "My daughter Emma is 5 years old and has a severe shellfish \
allergy. Even small amounts can cause anaphylaxis.";

pub const RISKY_PLAN: &str = "I'm at the grocery store. I'm thinking of buying some shrimp to \
cook for dinner for Emma tonight. She's never tried it before!";

/// Two separate conversations with a pause between them. Nothing carries over
/// except what the first one stored in the memory service.
pub async fn run_demo<M: ModelClient, W: Write>(
    orchestrator: &Orchestrator<M>,
    demo: &DemoConfig,
    pacing: Pacing,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{}", SCENARIO.title)?;
    divider(out)?;
    writeln!(out, "\nThis demo shows how persistent memory can prevent dangerous mistakes.")?;
    writeln!(out, "Scenario: Parent with child who has shellfish allergy")?;

    banner(out, "CONVERSATION 1: Sharing Family Information")?;
    let mut first = Transcript::new();
    writeln!(out, "\nParent: {SHARE_ALLERGY}")?;
    let reply = orchestrator.chat(&mut first, SHARE_ALLERGY).await?;
    print_tool_calls(out, &reply.tool_calls)?;
    writeln!(out, "\nAssistant: {}", reply.text)?;

    banner(out, " Simulating time passing... (New conversation session)")?;
    out.flush()?;
    pacing.sleep(Duration::from_secs(demo.session_pause_secs)).await;

    banner(out, "CONVERSATION 2: Potential Dangerous Action (Days/Weeks Later)")?;
    let mut second = Transcript::new();
    writeln!(out, "\nParent: {RISKY_PLAN}")?;
    let reply = orchestrator.chat(&mut second, RISKY_PLAN).await?;
    print_tool_calls(out, &reply.tool_calls)?;
    writeln!(out, "\nAssistant: {}", reply.text)?;

    banner(out, "DEMO COMPLETE")?;
    writeln!(out, "\nWhat just happened:")?;
    writeln!(out, "  1. In conversation 1: Agent stored Emma's shellfish allergy")?;
    writeln!(out, "  2. In conversation 2: Agent proactively searched memory")?;
    writeln!(out, "  3. Agent retrieved the critical safety information and warned the parent")?;
    divider(out)?;
    Ok(())
}
