//! OpenAI-compatible chat completions provider
//!
//! Works against api.openai.com and any server exposing the same
//! `/chat/completions` surface. Tool calls use the native `tools` /
//! `tool_calls` fields; function arguments travel as JSON-encoded strings.

use super::{GenerationOptions, LLMError, LLMProvider, LLMResponse, Message, MessageRole, ToolCall, ToolSpec};
use crate::config::OpenAIConfig;
use crate::secrets::{self, SecretCache};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct OpenAIProvider {
    config: OpenAIConfig,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: OpenAIConfig, secret_cache: Arc<SecretCache>) -> Self {
        Self {
            config,
            secret_cache,
            client: reqwest::Client::new(),
        }
    }
}

fn convert_message(msg: &Message) -> Value {
    match msg.role {
        MessageRole::Tool => json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id.clone().unwrap_or_default(),
            "content": msg.content,
        }),
        MessageRole::Assistant if !msg.tool_calls.is_empty() => {
            let calls: Vec<Value> = msg
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect();
            let content = if msg.content.is_empty() {
                Value::Null
            } else {
                json!(msg.content)
            };
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        _ => json!({ "role": msg.role.to_string(), "content": msg.content }),
    }
}

fn convert_tools(tools: &[ToolSpec]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Decode function arguments; a malformed payload is passed through as a
/// string so the tool reports it back to the model.
fn decode_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_response(data: ChatResponse) -> super::Result<LLMResponse> {
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

    let calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall::new(call.id, call.function.name, decode_arguments(&call.function.arguments)))
        .collect();

    Ok(LLMResponse::from_parts(choice.message.content.unwrap_or_default(), calls))
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn check_health(&self) -> bool {
        self.secret_cache.has_secret(secrets::OPENAI_API_KEY)
    }

    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        options: &GenerationOptions,
    ) -> super::Result<LLMResponse> {
        let api_key = self
            .secret_cache
            .get_secret(secrets::OPENAI_API_KEY)
            .map_err(|e| LLMError::AuthenticationFailed(e.to_string()))?;

        let url = format!("{}/chat/completions", self.config.base_url);

        let mut payload = json!({
            "model": options.model_or(&self.config.model),
            "messages": messages.iter().map(convert_message).collect::<Vec<_>>(),
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });
        if !tools.is_empty() {
            payload["tools"] = json!(convert_tools(tools));
        }

        tracing::debug!(
            "OpenAI request: model={}, messages={}, tools={}",
            options.model_or(&self.config.model),
            messages.len(),
            tools.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| LLMError::from_transport(e, "OpenAI", &self.config.base_url))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, secrets::scrub(&text)));
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        parse_response(data)
    }
}
