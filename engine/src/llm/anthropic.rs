//! Anthropic Messages API provider
//!
//! Tools are bound natively: the catalog goes out as `tools[].input_schema`,
//! `tool_use` content blocks come back as tool calls, and tool results are
//! sent as `tool_result` blocks inside a user turn.

use super::{GenerationOptions, LLMError, LLMProvider, LLMResponse, Message, MessageRole, ToolCall, ToolSpec};
use crate::config::AnthropicConfig;
use crate::secrets::{self, SecretCache};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Sent as the opening user turn when history starts with the assistant
/// or when nothing non-empty is left to send.
const CONTINUATION_PLACEHOLDER: &str = "(conversation continues)";

pub struct AnthropicProvider {
    config: AnthropicConfig,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig, secret_cache: Arc<SecretCache>) -> Self {
        Self {
            config,
            secret_cache,
            client: reqwest::Client::new(),
        }
    }
}

/// Split out the system prompt and build the `messages` array.
///
/// The API wants strictly alternating roles, so consecutive messages that map
/// to the same role are merged into one turn with several content blocks.
/// Empty text blocks are rejected by the API, so they are never emitted; a
/// message with nothing left to send is dropped and its neighbours merge.
fn convert_messages(messages: &[Message]) -> (String, Vec<Value>) {
    let mut system_prompt = String::new();
    let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();

    for msg in messages {
        let (role, blocks) = match msg.role {
            MessageRole::System => {
                if !system_prompt.is_empty() {
                    system_prompt.push_str("\n\n");
                }
                system_prompt.push_str(&msg.content);
                continue;
            }
            MessageRole::User => {
                if msg.content.is_empty() {
                    continue;
                }
                ("user", vec![json!({ "type": "text", "text": msg.content })])
            }
            MessageRole::Assistant => {
                let mut blocks = Vec::new();
                if !msg.content.is_empty() {
                    blocks.push(json!({ "type": "text", "text": msg.content }));
                }
                for call in &msg.tool_calls {
                    blocks.push(json!({
                        "type": "tool_use",
                        "id": call.id,
                        "name": call.name,
                        "input": call.arguments,
                    }));
                }
                if blocks.is_empty() {
                    continue;
                }
                ("assistant", blocks)
            }
            MessageRole::Tool => (
                "user",
                vec![json!({
                    "type": "tool_result",
                    "tool_use_id": msg.tool_call_id.clone().unwrap_or_default(),
                    "content": msg.content,
                })],
            ),
        };

        if let Some((last_role, last_blocks)) = turns.last_mut() {
            if *last_role == role {
                last_blocks.extend(blocks);
                continue;
            }
        }
        turns.push((role, blocks));
    }

    if matches!(turns.first(), Some(("assistant", _)) | None) {
        turns.insert(
            0,
            ("user", vec![json!({ "type": "text", "text": CONTINUATION_PLACEHOLDER })]),
        );
    }

    let api_messages = turns
        .into_iter()
        .map(|(role, content)| json!({ "role": role, "content": content }))
        .collect();

    (system_prompt, api_messages)
}

fn convert_tools(tools: &[ToolSpec]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.parameters,
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

fn parse_response(data: AnthropicResponse) -> LLMResponse {
    let mut text = String::new();
    let mut calls = Vec::new();

    for block in data.content {
        match block {
            ContentBlock::Text { text: t } => text.push_str(&t),
            ContentBlock::ToolUse { id, name, input } => calls.push(ToolCall::new(id, name, input)),
            ContentBlock::Other => {}
        }
    }

    LLMResponse::from_parts(text, calls)
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn check_health(&self) -> bool {
        self.secret_cache.has_secret(secrets::ANTHROPIC_API_KEY)
    }

    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        options: &GenerationOptions,
    ) -> super::Result<LLMResponse> {
        let api_key = self
            .secret_cache
            .get_secret(secrets::ANTHROPIC_API_KEY)
            .map_err(|e| LLMError::AuthenticationFailed(e.to_string()))?;

        let url = format!("{}/messages", self.config.base_url);
        let (system_prompt, api_messages) = convert_messages(messages);

        let mut payload = json!({
            "model": options.model_or(&self.config.model),
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "messages": api_messages,
        });
        if !system_prompt.is_empty() {
            payload["system"] = json!(system_prompt);
        }
        if !tools.is_empty() {
            payload["tools"] = json!(convert_tools(tools));
        }

        tracing::debug!(
            "Anthropic request: model={}, messages={}, tools={}",
            options.model_or(&self.config.model),
            messages.len(),
            tools.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| LLMError::from_transport(e, "Anthropic", &self.config.base_url))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, secrets::scrub(&text)));
        }

        let data: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        Ok(parse_response(data))
    }
}
