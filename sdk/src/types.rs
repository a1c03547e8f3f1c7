//! Tool description and argument types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of a tool the completion model may call.
///
/// `parameters` is a JSON Schema object describing the arguments. Providers
/// translate it into their own wire format (Anthropic `input_schema`,
/// OpenAI `function.parameters`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSpec {
    /// Create a new tool spec
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Build an object schema where every listed property is a required string.
    pub fn with_string_params(
        name: impl Into<String>,
        description: impl Into<String>,
        params: &[(&str, &str)],
    ) -> Self {
        let mut properties = serde_json::Map::new();
        for (param, desc) in params {
            properties.insert(
                (*param).to_string(),
                serde_json::json!({ "type": "string", "description": desc }),
            );
        }
        let required: Vec<&str> = params.iter().map(|(param, _)| *param).collect();

        Self::new(
            name,
            description,
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        )
    }
}

/// Arguments passed to a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub name: String,
    pub arguments: Value,
}

impl ToolInput {
    /// Create a new ToolInput
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Get a string parameter
    pub fn param_str(&self, key: &str) -> Result<String, ToolError> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| ToolError::MissingParameter(key.to_string()))
    }

    /// Get an optional i64 parameter
    pub fn param_i64_opt(&self, key: &str) -> Option<i64> {
        self.arguments.get(key).and_then(|v| v.as_i64())
    }
}

/// Tool-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Execution failed: {0}")]
    Execution(String),
}
