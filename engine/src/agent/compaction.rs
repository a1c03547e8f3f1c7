//! Memory compaction
//!
//! Folds a run of old messages into the rolling summary with one completion
//! call. The function is pure over its inputs apart from that call.

use crate::llm::{self, GenerationOptions, LLMProvider, Message};

pub const CREATE_SUMMARY_PROMPT: &str = "Create a summary of the conversation above:";

/// Result of a fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// The model produced a new summary
    Summarized(String),
    /// The model returned only whitespace
    Empty,
}

/// Instruction appended after the transcript
pub fn fold_instruction(summary: Option<&str>) -> String {
    match summary {
        Some(summary) if !summary.trim().is_empty() => format!(
            "This is summary of the conversation to date: {}\n\n\
             Extend the summary by taking into account the new messages above:",
            summary
        ),
        _ => CREATE_SUMMARY_PROMPT.to_string(),
    }
}

/// Render messages oldest first as `role: content` lines
pub fn transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            if m.is_tool_request() {
                let calls = m
                    .tool_calls
                    .iter()
                    .map(|c| format!("{}({})", c.name, c.arguments))
                    .collect::<Vec<_>>()
                    .join(", ");
                if m.content.is_empty() {
                    format!("assistant: [called {}]", calls)
                } else {
                    format!("assistant: {} [called {}]", m.content, calls)
                }
            } else {
                format!("{}: {}", m.role, m.content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the single user message sent for a fold
pub fn fold_prompt(summary: Option<&str>, to_fold: &[Message]) -> String {
    format!("{}\n\n{}", transcript(to_fold), fold_instruction(summary))
}

/// Fold `to_fold` into `summary` with one completion call (no tools bound).
pub async fn compact(
    provider: &dyn LLMProvider,
    options: &GenerationOptions,
    summary: Option<&str>,
    to_fold: &[Message],
) -> llm::Result<CompactionOutcome> {
    let prompt = [Message::user(fold_prompt(summary, to_fold))];
    let text = llm::complete_text(provider, &prompt, options).await?;

    let text = text.trim();
    if text.is_empty() {
        Ok(CompactionOutcome::Empty)
    } else {
        Ok(CompactionOutcome::Summarized(text.to_string()))
    }
}
