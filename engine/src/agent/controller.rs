//! Turn Controller
//!
//! Advances one conversation by one turn. Each turn runs a small state machine:
//!
//! 1. `AwaitCompletion`: send preamble (+ rolling summary) and the message log
//! 2. `ToolDispatch`: run requested tools, append results, go back to 1
//! 3. `Summarize`: fold the oldest messages into the summary once the log is
//!    longer than `summarization_threshold`
//! 4. `Done`: the reply is the last assistant message of the turn
//!
//! The turn works on a draft copy of the memory and writes it back only after
//! its last await. If the caller drops the future, memory is untouched. If a
//! completion call fails, only the user message is kept.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::{AgentConfig, EmptySummaryPolicy};
use crate::llm::{GenerationOptions, LLMError, LLMProvider, LLMResponse, Message, ToolCall, ToolSpec};
use crate::secrets;
use crate::tools::ToolExecutor;
use eva_sdk::errors::EngineError;

use super::compaction::{self, CompactionOutcome};
use super::memory::{self, ConversationMemory};

/// Settings for the turn state machine
#[derive(Debug, Clone)]
pub struct TurnConfig {
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub summarization_threshold: usize,
    pub system_preamble: String,
    pub max_tool_iterations: usize,
    pub llm_timeout: Duration,
    pub empty_summary_policy: EmptySummaryPolicy,
    pub context_warn_tokens: usize,
}

impl From<&AgentConfig> for TurnConfig {
    fn from(config: &AgentConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            summarization_threshold: config.summarization_threshold,
            system_preamble: config.system_preamble.clone(),
            max_tool_iterations: config.max_tool_iterations,
            llm_timeout: Duration::from_secs(config.llm_timeout_secs),
            empty_summary_policy: config.empty_summary_policy,
            context_warn_tokens: config.context_warn_tokens,
        }
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}

/// A message arriving from a chat front-end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub author: Option<String>,
    pub content: String,
}

impl IncomingMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            author: None,
            content: content.into(),
        }
    }

    pub fn from_author(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            content: content.into(),
        }
    }

    /// Content as stored in memory: `"alice: hello"` when an author is known
    pub fn formatted(&self) -> String {
        match self.author.as_deref() {
            Some(author) if !author.is_empty() => format!("{}: {}", author, self.content),
            _ => self.content.clone(),
        }
    }
}

/// What happened to memory at the end of a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompactionStatus {
    /// Log is within the threshold
    NotNeeded,
    /// `folded` messages were merged into the summary and removed
    Compacted { folded: usize },
    /// The model returned an empty summary; `dropped` messages were removed anyway
    EmptySummary { dropped: usize },
    /// Compaction failed; memory was committed uncompacted and will retry next turn
    Failed { reason: String },
}

/// Outcome of a successful turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub reply: String,
    pub compaction: CompactionStatus,
    pub completion_calls: usize,
    pub tool_calls: usize,
    pub duration_ms: u64,
}

/// States of one turn
#[derive(Debug)]
enum TurnState {
    AwaitCompletion,
    ToolDispatch(Vec<ToolCall>),
    Summarize,
    Done,
}

/// Drives conversation turns against an injected provider and tool executor
pub struct TurnController {
    provider: Arc<dyn LLMProvider>,
    tools: Arc<dyn ToolExecutor>,
    config: TurnConfig,
}

impl TurnController {
    pub fn new(provider: Arc<dyn LLMProvider>, tools: Arc<dyn ToolExecutor>, config: TurnConfig) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    fn generation_options(&self) -> GenerationOptions {
        GenerationOptions::new(self.config.temperature, self.config.max_tokens)
            .with_model(self.config.model.clone())
    }

    /// Preamble (+ summary) followed by the message log
    pub fn build_prompt(&self, memory: &ConversationMemory) -> Vec<Message> {
        let mut system = self.config.system_preamble.trim().to_string();
        if let Some(summary) = memory.summary() {
            if !system.is_empty() {
                system.push_str("\n\n");
            }
            system.push_str("Summary of conversation earlier: ");
            system.push_str(summary);
        }

        let mut prompt = Vec::with_capacity(memory.len() + 1);
        if !system.is_empty() {
            prompt.push(Message::system(system));
        }
        prompt.extend(memory.messages().iter().cloned());
        prompt
    }

    /// One bounded completion call
    async fn complete(&self, prompt: &[Message], catalog: &[ToolSpec]) -> std::result::Result<LLMResponse, EngineError> {
        let options = self.generation_options();
        match timeout(self.config.llm_timeout, self.provider.generate(prompt, catalog, &options)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(completion_error(e)),
            Err(_) => Err(EngineError::LLMTimeout),
        }
    }

    /// Advance `memory` by one turn.
    ///
    /// On success the updated memory is written back and the reply returned.
    /// On a completion failure the user message is appended and the error
    /// returned; nothing else from the turn is kept.
    pub async fn advance_turn(
        &self,
        memory: &mut ConversationMemory,
        message: IncomingMessage,
        catalog: &[ToolSpec],
    ) -> Result<TurnResult> {
        let start = Instant::now();
        let thread_id = memory.thread_id().to_string();
        info!("Turn started on thread '{}' ({} messages in memory)", thread_id, memory.len());

        let user_message = Message::user(message.formatted());
        let mut draft = memory.clone();
        draft.push(user_message.clone());

        let mut state = TurnState::AwaitCompletion;
        let mut reply = String::new();
        let mut compaction = CompactionStatus::NotNeeded;
        let mut completion_calls = 0;
        let mut tool_calls = 0;
        let mut tool_rounds = 0;

        loop {
            debug!("Thread '{}' state: {:?}", thread_id, state);
            state = match state {
                TurnState::AwaitCompletion => {
                    let prompt = self.build_prompt(&draft);
                    let prompt_tokens: usize = prompt.iter().map(memory::estimate_tokens).sum();
                    if prompt_tokens > self.config.context_warn_tokens {
                        warn!(
                            "Prompt for thread '{}' is ~{} tokens (warn threshold {})",
                            thread_id, prompt_tokens, self.config.context_warn_tokens
                        );
                    }

                    completion_calls += 1;
                    let response = match self.complete(&prompt, catalog).await {
                        Ok(response) => response,
                        Err(e) => return Err(self.fail_turn(memory, user_message, &thread_id, e)),
                    };

                    match response {
                        LLMResponse::ToolCalls(request) if !request.calls.is_empty() => {
                            if tool_rounds >= self.config.max_tool_iterations {
                                let e = EngineError::ToolLoopExceeded {
                                    limit: self.config.max_tool_iterations,
                                };
                                return Err(self.fail_turn(memory, user_message, &thread_id, e));
                            }
                            debug!("Model requested {} tool call(s)", request.calls.len());
                            draft.push(Message::tool_request(request.content, request.calls.clone()));
                            TurnState::ToolDispatch(request.calls)
                        }
                        LLMResponse::ToolCalls(request) => self.finish_reply(&mut draft, &mut reply, request.content),
                        LLMResponse::FinalAnswer(answer) => self.finish_reply(&mut draft, &mut reply, answer.content),
                    }
                }
                TurnState::ToolDispatch(calls) => {
                    tool_rounds += 1;
                    for call in calls {
                        tool_calls += 1;
                        if !catalog.iter().any(|spec| spec.name == call.name) {
                            warn!("Model called tool '{}' outside this turn's catalog", call.name);
                            let output = format!("ERROR: tool '{}' is not available", call.name);
                            draft.push(Message::tool_result(output, call.id));
                            continue;
                        }
                        let output = match self.tools.execute(&call).await {
                            Ok(output) => output,
                            Err(e) => {
                                warn!("Tool '{}' failed: {}", call.name, e);
                                format!("ERROR: {}", secrets::scrub(&e.to_string()))
                            }
                        };
                        draft.push(Message::tool_result(output, call.id));
                    }
                    TurnState::AwaitCompletion
                }
                TurnState::Summarize => {
                    compaction = self.summarize(&mut draft).await;
                    TurnState::Done
                }
                TurnState::Done => break,
            };
        }

        *memory = draft;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Turn on thread '{}' completed in {}ms ({} completion calls, {} tool calls, {} messages in memory)",
            thread_id,
            duration_ms,
            completion_calls,
            tool_calls,
            memory.len()
        );

        Ok(TurnResult {
            reply,
            compaction,
            completion_calls,
            tool_calls,
            duration_ms,
        })
    }

    fn finish_reply(&self, draft: &mut ConversationMemory, reply: &mut String, content: String) -> TurnState {
        draft.push(Message::assistant(content.clone()));
        *reply = content;
        if draft.len() > self.config.summarization_threshold {
            TurnState::Summarize
        } else {
            TurnState::Done
        }
    }

    /// Keep the user message, drop everything else the turn produced
    fn fail_turn(
        &self,
        memory: &mut ConversationMemory,
        user_message: Message,
        thread_id: &str,
        err: EngineError,
    ) -> anyhow::Error {
        error!("Turn on thread '{}' failed: {}", thread_id, err);
        memory.push(user_message);
        anyhow::Error::new(err).context(format!("turn failed on thread '{}'", thread_id))
    }

    /// Fold everything older than the retained window into the summary
    async fn summarize(&self, draft: &mut ConversationMemory) -> CompactionStatus {
        let boundary = draft.fold_boundary(self.config.summarization_threshold);
        if boundary == 0 {
            return CompactionStatus::NotNeeded;
        }

        let to_fold = draft.messages()[..boundary].to_vec();
        let options = self.generation_options();
        debug!("Folding {} messages into the summary", to_fold.len());

        let outcome = timeout(
            self.config.llm_timeout,
            compaction::compact(self.provider.as_ref(), &options, draft.summary(), &to_fold),
        )
        .await;

        let folded_ids = to_fold.iter().map(|m| m.id.as_str());
        match outcome {
            Ok(Ok(CompactionOutcome::Summarized(summary))) => {
                draft.set_summary(summary);
                let folded = draft.remove_by_ids(folded_ids);
                info!("Compacted {} messages into the rolling summary", folded);
                CompactionStatus::Compacted { folded }
            }
            Ok(Ok(CompactionOutcome::Empty)) => match self.config.empty_summary_policy {
                EmptySummaryPolicy::Retain => {
                    warn!("Compaction returned an empty summary; keeping {} messages", boundary);
                    CompactionStatus::EmptySummary { dropped: 0 }
                }
                EmptySummaryPolicy::Drop => {
                    let dropped = draft.remove_by_ids(folded_ids);
                    warn!("Compaction returned an empty summary; dropped {} messages", dropped);
                    CompactionStatus::EmptySummary { dropped }
                }
            },
            Ok(Err(e)) => {
                let err = EngineError::CompactionFailed(secrets::scrub(&e.to_string()));
                warn!("{}; will retry next turn", err);
                CompactionStatus::Failed { reason: err.to_string() }
            }
            Err(_) => {
                let err = EngineError::CompactionFailed("summary call timed out".to_string());
                warn!("{}; will retry next turn", err);
                CompactionStatus::Failed { reason: err.to_string() }
            }
        }
    }
}

fn completion_error(err: LLMError) -> EngineError {
    match err {
        LLMError::Timeout => EngineError::LLMTimeout,
        other => EngineError::LLMProvider(secrets::scrub(&other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incoming_message_formatting() {
        assert_eq!(IncomingMessage::from_author("alice", "hello").formatted(), "alice: hello");
        assert_eq!(IncomingMessage::new("hello").formatted(), "hello");
        assert_eq!(IncomingMessage::from_author("", "hello").formatted(), "hello");
    }

    #[test]
    fn test_turn_config_from_agent_config() {
        let agent = AgentConfig {
            llm_timeout_secs: 7,
            summarization_threshold: 3,
            ..AgentConfig::default()
        };
        let config = TurnConfig::from(&agent);
        assert_eq!(config.llm_timeout, Duration::from_secs(7));
        assert_eq!(config.summarization_threshold, 3);
    }

    #[test]
    fn test_completion_error_mapping() {
        assert!(matches!(completion_error(LLMError::Timeout), EngineError::LLMTimeout));
        match completion_error(LLMError::AuthenticationFailed("sk-ant-REDACTED".to_string())) {
            EngineError::LLMProvider(msg) => assert!(msg.contains("[REDACTED]")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_compaction_status_serializes_tagged() {
        let json = serde_json::to_value(CompactionStatus::Compacted { folded: 3 }).unwrap();
        assert_eq!(json["status"], "compacted");
        assert_eq!(json["folded"], 3);
    }
}
