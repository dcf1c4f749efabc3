//! Agent-to-agent curation: the assistant hands a long free-form biography to
//! the service's internal curation agent, then answers questions from the
//! memories it produced.

use std::io::Write;

use anyhow::Result;
use serde_json::Value;

use super::{banner, divider, preview, Pacing, Scenario};
use crate::model::ModelClient;
use crate::orchestrator::{Orchestrator, ToolCallRecord, Transcript};
use crate::tools::ToolKind;

pub const SYSTEM_PROMPT: &str = "\
You are a personal assistant that helps users manage their information.

When a user shares personal information with you, use the agent_curate tool to
store it in Hippocampus. The service has an internal AI agent that will
decompose the information into searchable memories.

When asked questions about the user, use search_memory to retrieve relevant information.

You decide:
- Which information is important enough to store
- The importance level (high/medium/low)
- How much delay between insertions (timeout_ms)
- Search parameters (epsilon, threshold, top_k)

Be conversational and explain what you're doing.";

pub const SCENARIO: Scenario = Scenario {
    name: "curate",
    title: "AI Agent -> AI Agent Curation Demo",
    agent_id: "curate_demo_user",
    system_prompt: SYSTEM_PROMPT,
    tools: &[ToolKind::AgentCurate, ToolKind::SearchMemory],
    reply_label: "Assistant",
    farewell: "Goodbye!",
};

pub const BIOGRAPHY: &str = "Hey, I wanted to update you on my life. My name is Sarah Chen, \
I'm 34 years old, and I work as a software engineer at Google focusing on cloud \
infrastructure. I live in Seattle with my husband Michael, who teaches high school \
math. We have two kids - Emma is 5 and has a severe peanut allergy, and Jake is 8 \
and plays competitive soccer. I'm currently training for the Seattle marathon in \
November, running about 40 miles a week. I'm mostly vegetarian but eat fish \
occasionally, and I'm allergic to shellfish and latex. I went to MIT for undergrad \
and got my master's at Stanford. My parents live in San Francisco, and I try to \
visit them monthly. I love sci-fi novels - currently reading the Three Body Problem \
series. I speak Mandarin fluently and I'm learning Spanish with the kids. We have \
a golden retriever named Cosmo who's 3 years old. I'm trying to quit coffee, down \
to one cup in the morning. My favorite programming language is Rust, but I mostly \
work in Go and Python at Google. Oh, and I've been taking piano lessons for about \
2 years now.";

pub const QUERIES: [&str; 3] = [
    "What programming languages does Sarah use?",
    "Tell me about Sarah's family",
    "Does Sarah have any allergies I should know about?",
];

/// Search hits shown per call before summarizing the rest.
const SHOWN_HITS: usize = 3;

/// Curation and search trace of one turn.
pub fn print_trace<W: Write>(out: &mut W, calls: &[ToolCallRecord]) -> std::io::Result<()> {
    for call in calls {
        if let Some(error) = call.result.get("error") {
            writeln!(out, "\n  x {} failed: {error}", call.name)?;
            continue;
        }
        match ToolKind::from_name(&call.name) {
            Some(ToolKind::AgentCurate) => {
                writeln!(out, "\n  Agent calling Hippocampus internal agent...")?;
                writeln!(out, "     Importance: {}", call.input["importance"])?;
                let created = call.result["memories_created"].as_u64().unwrap_or(0);
                writeln!(out, "  Internal agent created {created} memories:")?;
                let sample = call.result["sample"].as_array().map(Vec::as_slice).unwrap_or(&[]);
                for memory in sample {
                    let text = memory["text"].as_str().unwrap_or_default();
                    writeln!(out, "     * {}: {}", memory["key"].as_str().unwrap_or_default(), preview(text, 50))?;
                }
                if created > sample.len() as u64 {
                    writeln!(out, "     ... and {} more", created - sample.len() as u64)?;
                }
            }
            Some(ToolKind::SearchMemory) => {
                writeln!(out, "\n  Agent searching memories...")?;
                let query = call.input.get("query").or_else(|| call.input.get("text"));
                writeln!(out, "     Query: {}", query.and_then(Value::as_str).unwrap_or_default())?;
                let params = &call.result["search_params"];
                writeln!(
                    out,
                    "     Parameters: epsilon={}, threshold={}, top_k={}",
                    params["epsilon"], params["threshold"], params["top_k"]
                )?;
                let hits = call.result["memories"].as_array().map(Vec::as_slice).unwrap_or(&[]);
                writeln!(out, "  Found {} relevant memories:", hits.len())?;
                for hit in hits.iter().take(SHOWN_HITS) {
                    writeln!(out, "     * {hit}")?;
                }
                if hits.len() > SHOWN_HITS {
                    writeln!(out, "     ... and {} more", hits.len() - SHOWN_HITS)?;
                }
            }
            _ => writeln!(out, "\n  {}: {}", call.name, call.input)?,
        }
    }
    Ok(())
}

/// The biography and every follow-up query share one transcript, so the
/// model can lean on what it already stored.
pub async fn run_demo<M: ModelClient, W: Write>(
    orchestrator: &Orchestrator<M>,
    pacing: Pacing,
    out: &mut W,
) -> Result<()> {
    writeln!(out, "{}", SCENARIO.title)?;
    divider(out)?;
    writeln!(out, "\nThis demonstrates an AI agent calling Hippocampus's internal")?;
    writeln!(out, "AI agent to curate information autonomously.")?;

    let mut transcript = Transcript::new();

    banner(out, "PART 1: Agent-to-Agent Curation")?;
    writeln!(out, "\nUser: {}\n", preview(BIOGRAPHY, 150))?;
    let reply = orchestrator.chat(&mut transcript, BIOGRAPHY).await?;
    print_trace(out, &reply.tool_calls)?;
    writeln!(out, "\nAssistant: {}", reply.text)?;
    pacing.wait_for_enter(out, "[Press Enter to continue...]")?;

    banner(out, "PART 2: Querying the Curated Memories")?;
    for (i, query) in QUERIES.iter().enumerate() {
        writeln!(out, "\nQuery {}: {query}\n", i + 1)?;
        let reply = orchestrator.chat(&mut transcript, query).await?;
        print_trace(out, &reply.tool_calls)?;
        writeln!(out, "\nAssistant: {}", reply.text)?;
        if i + 1 < QUERIES.len() {
            pacing.wait_for_enter(out, "[Press Enter for next query...]")?;
        }
    }

    banner(out, "DEMONSTRATION COMPLETE")?;
    writeln!(out, "\nWhat just happened:")?;
    writeln!(out, "  1. The assistant handed the raw text to the agent_curate tool")?;
    writeln!(out, "  2. Hippocampus's internal agent decomposed it into discrete memories")?;
    writeln!(out, "  3. Follow-up questions were answered from those memories")?;
    divider(out)?;
    Ok(())
}
