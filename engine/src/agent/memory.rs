//! Conversation Memory
//!
//! Per-thread message log plus an optional rolling summary. The turn
//! controller appends to it and, when the log grows past the summarization
//! threshold, folds the oldest messages into the summary and removes them by id.

use crate::llm::{Message, MessageRole};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Average characters per token (rough estimate: 1 token ≈ 4 characters)
const CHARS_PER_TOKEN: usize = 4;

/// Per-message overhead for role and structure, in tokens
const MESSAGE_OVERHEAD_TOKENS: usize = 10;

/// Message log and rolling summary for one thread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationMemory {
    thread_id: String,
    messages: Vec<Message>,
    summary: Option<String>,
}

impl ConversationMemory {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
            summary: None,
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Messages in conversation order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The rolling summary, if compaction has happened
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = Some(summary.into());
    }

    /// Drop all messages and the summary, keeping the thread id
    pub fn clear(&mut self) {
        self.messages.clear();
        self.summary = None;
    }

    /// Index splitting the log into `[..boundary]` to fold and `[boundary..]` to keep.
    ///
    /// Keeps at most `keep_count` messages. The kept window never starts with a
    /// tool result, since the assistant request it answers would be folded.
    pub fn fold_boundary(&self, keep_count: usize) -> usize {
        let mut boundary = self.messages.len().saturating_sub(keep_count);
        while boundary < self.messages.len() && self.messages[boundary].role == MessageRole::Tool {
            boundary += 1;
        }
        boundary
    }

    /// Remove every message whose id is in `ids`; returns how many were removed
    pub fn remove_by_ids<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ids: HashSet<&str> = ids.into_iter().collect();
        let before = self.messages.len();
        self.messages.retain(|m| !ids.contains(m.id.as_str()));
        before - self.messages.len()
    }
}

/// Estimate the number of tokens in a message
///
/// This is a rough estimate based on character count. Different tokenizers
/// will produce different results, but this provides a reasonable approximation.
pub fn estimate_tokens(message: &Message) -> usize {
    let content_chars = message.content.len();

    let tool_call_chars = message
        .tool_call_id
        .as_ref()
        .map(|id| id.len())
        .unwrap_or(0);

    let request_chars: usize = message
        .tool_calls
        .iter()
        .map(|call| call.name.len() + call.arguments.to_string().len())
        .sum();

    let total_chars = content_chars + tool_call_chars + request_chars;
    total_chars.div_ceil(CHARS_PER_TOKEN) + MESSAGE_OVERHEAD_TOKENS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use serde_json::json;

    fn memory_with(messages: Vec<Message>) -> ConversationMemory {
        let mut memory = ConversationMemory::new("t1");
        for m in messages {
            memory.push(m);
        }
        memory
    }

    #[test]
    fn test_new_memory() {
        let memory = ConversationMemory::new("thread-a");
        assert_eq!(memory.thread_id(), "thread-a");
        assert!(memory.is_empty());
        assert_eq!(memory.summary(), None);
    }

    #[test]
    fn test_fold_boundary_plain() {
        let memory = memory_with((0..6).map(|i| Message::user(format!("m{}", i))).collect());
        assert_eq!(memory.fold_boundary(4), 2);
        assert_eq!(memory.fold_boundary(10), 0);
        assert_eq!(memory.fold_boundary(6), 0);
    }

    #[test]
    fn test_fold_boundary_skips_leading_tool_results() {
        let call = ToolCall::new("c1", "echo", json!({}));
        let memory = memory_with(vec![
            Message::user("hi"),
            Message::tool_request("", vec![call]),
            Message::tool_result("pong", "c1"),
            Message::tool_result("pong again", "c1"),
            Message::assistant("done"),
        ]);

        // keep 3 would start at the first tool result
        assert_eq!(memory.fold_boundary(3), 4);
        assert_eq!(memory.messages()[4].role, MessageRole::Assistant);
    }

    #[test]
    fn test_remove_by_ids() {
        let mut memory = memory_with(vec![Message::user("a"), Message::assistant("b"), Message::user("c")]);
        let ids: Vec<String> = memory.messages()[..2].iter().map(|m| m.id.clone()).collect();

        let removed = memory.remove_by_ids(ids.iter().map(String::as_str));
        assert_eq!(removed, 2);
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.messages()[0].content, "c");
    }

    #[test]
    fn test_clear_keeps_thread() {
        let mut memory = memory_with(vec![Message::user("a")]);
        memory.set_summary("s");
        memory.clear();
        assert!(memory.is_empty());
        assert_eq!(memory.summary(), None);
        assert_eq!(memory.thread_id(), "t1");
    }

    #[test]
    fn test_estimate_tokens() {
        let short_tokens = estimate_tokens(&Message::user("Hi"));
        let long_tokens = estimate_tokens(&Message::user("a".repeat(400)));
        assert_eq!(short_tokens, 1 + MESSAGE_OVERHEAD_TOKENS);
        assert_eq!(long_tokens, 100 + MESSAGE_OVERHEAD_TOKENS);
    }
}
