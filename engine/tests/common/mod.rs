//! Shared test fixtures: a scripted completion provider and an echo tool.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eva_engine::agent::compaction::CREATE_SUMMARY_PROMPT;
use eva_engine::agent::{TurnConfig, TurnController};
use eva_engine::llm::{
    FinalAnswer, GenerationOptions, LLMError, LLMProvider, LLMResponse, Message, MessageRole, ToolCall, ToolCallRequest,
    ToolSpec,
};
use eva_engine::tools::{Tool, ToolRegistry};
use eva_sdk::types::{ToolError, ToolInput};

type Responder = Box<dyn Fn(&[Message], &[ToolSpec]) -> Result<LLMResponse, LLMError> + Send + Sync>;

/// One recorded `generate` call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
    pub options: GenerationOptions,
}

impl RecordedCall {
    /// True when this call was a summary fold rather than a turn completion
    pub fn is_fold(&self) -> bool {
        self.messages.last().is_some_and(|m| is_fold_prompt(&m.content))
    }
}

pub fn is_fold_prompt(content: &str) -> bool {
    content.ends_with(CREATE_SUMMARY_PROMPT)
        || content.ends_with("Extend the summary by taking into account the new messages above:")
}

/// Provider that answers from a queue, then from a responder closure.
///
/// With neither, turn completions echo the last user message and folds
/// return a summary naming how many lines were folded.
pub struct ScriptedProvider {
    queue: Mutex<VecDeque<Result<LLMResponse, LLMError>>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            responder: None,
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&[Message], &[ToolSpec]) -> Result<LLMResponse, LLMError> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn then_reply(self, text: &str) -> Self {
        self.then(Ok(LLMResponse::FinalAnswer(FinalAnswer::new(text))))
    }

    pub fn then_tool(self, name: &str, arguments: serde_json::Value) -> Self {
        let call = ToolCall::generated(name, arguments);
        self.then(Ok(LLMResponse::ToolCalls(ToolCallRequest::new("", vec![call]))))
    }

    pub fn then_fail(self, err: LLMError) -> Self {
        self.then(Err(err))
    }

    pub fn then(self, response: Result<LLMResponse, LLMError>) -> Self {
        self.queue.lock().unwrap().push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn fold_calls(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(RecordedCall::is_fold).collect()
    }

    fn default_response(messages: &[Message]) -> LLMResponse {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        if is_fold_prompt(last) {
            let folded = last.lines().take_while(|line| !line.is_empty()).count();
            return LLMResponse::FinalAnswer(FinalAnswer::new(format!("Summary of {} messages", folded)));
        }

        let user = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        LLMResponse::FinalAnswer(FinalAnswer::new(format!("You said: {}", user)))
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        options: &GenerationOptions,
    ) -> Result<LLMResponse, LLMError> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            options: options.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.queue.lock().unwrap().pop_front();
        match (queued, &self.responder) {
            (Some(response), _) => response,
            (None, Some(responder)) => responder(messages, tools),
            (None, None) => Ok(Self::default_response(messages)),
        }
    }
}

/// Replies "pong" to everything
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::with_string_params("echo", "Echo a text back", &[("text", "Text to echo")])
    }

    async fn call(&self, input: ToolInput) -> Result<String, ToolError> {
        input.param_str("text")?;
        Ok("pong".to_string())
    }
}

/// Always fails
pub struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::with_string_params("broken", "Never works", &[])
    }

    async fn call(&self, _input: ToolInput) -> Result<String, ToolError> {
        Err(ToolError::Execution("disk on fire".to_string()))
    }
}

pub fn tool_registry() -> ToolRegistry {
    ToolRegistry::empty()
        .with_tool(Arc::new(EchoTool))
        .with_tool(Arc::new(BrokenTool))
}

pub fn turn_config(threshold: usize) -> TurnConfig {
    TurnConfig {
        summarization_threshold: threshold,
        system_preamble: "You are Eva.".to_string(),
        llm_timeout: Duration::from_secs(5),
        ..TurnConfig::default()
    }
}

pub fn controller(provider: Arc<ScriptedProvider>, config: TurnConfig) -> TurnController {
    TurnController::new(provider, Arc::new(tool_registry()), config)
}
