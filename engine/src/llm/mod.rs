//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for the completion backends Eva can
//! talk to (Anthropic, OpenAI-compatible endpoints, Ollama). The `LLMProvider`
//! trait is the "completion client" capability the turn controller and the text
//! services are built on: role-tagged messages and a tool catalog go in, and
//! either a final answer or a structured tool-call request comes out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use eva_sdk::ToolSpec;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LLMError {
    /// Map a non-success HTTP status and body to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => LLMError::AuthenticationFailed(body),
            429 => LLMError::RateLimitExceeded,
            _ => LLMError::InvalidRequest(format!("HTTP {}: {}", status, body)),
        }
    }

    /// Map a reqwest transport error to an error.
    pub fn from_transport(err: reqwest::Error, provider: &str, base_url: &str) -> Self {
        if err.is_timeout() {
            LLMError::Timeout
        } else if err.is_connect() {
            LLMError::ProviderUnavailable(format!("Cannot connect to {} at {}", provider, base_url))
        } else {
            LLMError::NetworkError(err.to_string())
        }
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Stable identity, used for targeted removal during compaction
    pub id: String,

    /// Role of the message sender (user, assistant, system, tool)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,

    /// Tool call this message answers (tool role only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool calls requested by the assistant in this message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content)
    }

    /// Create an assistant message that requests tool calls
    pub fn tool_request(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        let mut message = Self::with_role(MessageRole::Assistant, content);
        message.tool_calls = calls;
        message
    }

    /// Create a new tool result message
    pub fn tool_result(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        let mut message = Self::with_role(MessageRole::Tool, content);
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    /// True for assistant messages that carry tool calls
    pub fn is_tool_request(&self) -> bool {
        self.role == MessageRole::Assistant && !self.tool_calls.is_empty()
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,

    /// Tool result message
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LLMResponse {
    /// LLM wants to call one or more tools before answering
    ToolCalls(ToolCallRequest),

    /// LLM has provided a final answer
    FinalAnswer(FinalAnswer),
}

impl LLMResponse {
    /// Build a response from text plus any calls the backend returned.
    ///
    /// An empty call list is a final answer.
    pub fn from_parts(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        if calls.is_empty() {
            LLMResponse::FinalAnswer(FinalAnswer::new(content))
        } else {
            LLMResponse::ToolCalls(ToolCallRequest::new(content, calls))
        }
    }
}

/// One or more tool calls requested in a single completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Text the model produced alongside the calls (often empty)
    #[serde(default)]
    pub content: String,

    /// Requested calls, in the order the model emitted them
    pub calls: Vec<ToolCall>,
}

impl ToolCallRequest {
    pub fn new(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            calls,
        }
    }
}

/// Tool call request from the LLM
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,

    /// Name of the tool to call
    pub name: String,

    /// Structured arguments for the tool
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Create a tool call with a generated id
    pub fn generated(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self::new(format!("call_{}", uuid::Uuid::new_v4()), name, arguments)
    }
}

/// Final answer from the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalAnswer {
    /// The answer content
    pub content: String,
}

impl FinalAnswer {
    /// Create a new final answer
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Per-call generation settings
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Overrides the provider's configured model when set
    pub model: Option<String>,

    /// Sampling temperature (0.0-1.0)
    pub temperature: f32,

    /// Upper bound on completion tokens
    pub max_tokens: u32,
}

impl GenerationOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: None,
            temperature,
            max_tokens,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    /// Resolve the model to send, falling back to the provider default
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default)
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::new(0.7, 4096)
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "openai", "anthropic")
    fn name(&self) -> &str;

    /// Returns the configured model identifier
    fn model(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama)
    fn is_local(&self) -> bool;

    /// Generate a response from the LLM
    ///
    /// # Arguments
    /// * `messages` - Conversation including the system preamble, user messages and tool results
    /// * `tools` - Tools the model may call; empty means no tools are bound
    /// * `options` - Model override, temperature and token limit
    ///
    /// # Returns
    /// * `Ok(LLMResponse)` - Either tool calls or a final answer
    /// * `Err(LLMError)` - If the request fails
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        options: &GenerationOptions,
    ) -> Result<LLMResponse>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Convenience for callers that only want text back (no tools bound).
pub async fn complete_text(
    provider: &dyn LLMProvider,
    messages: &[Message],
    options: &GenerationOptions,
) -> Result<String> {
    match provider.generate(messages, &[], options).await? {
        LLMResponse::FinalAnswer(answer) => Ok(answer.content),
        LLMResponse::ToolCalls(request) => Ok(request.content),
    }
}

/// Helper function to parse a tool call embedded in plain text.
///
/// Used for local models that ignore the native tool protocol. Handles:
/// 1. Raw JSON: `{"function": "...", "arguments": {...}}`
/// 2. Fenced JSON (with or without trailing text): ` ```json\n{...}\n``` `
/// 3. JSON embedded in prose: scans for `{"function":` anywhere
pub fn parse_tool_calls(content: &str) -> Option<ToolCall> {
    let trimmed = content.trim();

    if let Some(tc) = try_parse_function_json(trimmed) {
        return Some(tc);
    }

    if let Some(inner) = extract_fenced_json(trimmed) {
        if let Some(tc) = try_parse_function_json(inner.trim()) {
            return Some(tc);
        }
    }

    if let Some(pos) = trimmed.find("{\"function\"") {
        if let Some(json_str) = extract_balanced_json(&trimmed[pos..]) {
            if let Some(tc) = try_parse_function_json(json_str) {
                return Some(tc);
            }
        }
    }

    None
}

/// Try to parse a string as a `{"function": "...", "arguments": {...}}` tool call.
fn try_parse_function_json(s: &str) -> Option<ToolCall> {
    let json: serde_json::Value = serde_json::from_str(s).ok()?;
    let function = json.get("function")?.as_str()?;
    let arguments = json.get("arguments")?.clone();
    Some(ToolCall::generated(function, arguments))
}

/// Extract the body of the first markdown code fence in the text.
fn extract_fenced_json(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start = fence_start + 3 + after_opening.find('\n')? + 1;
    let body_end = body_start + content[body_start..].find("```")?;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
