pub mod web_search;

pub use web_search::TavilySearchTool;

use crate::llm::ToolCall;
use async_trait::async_trait;
use eva_sdk::types::{ToolError, ToolInput, ToolSpec};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A capability the completion model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and argument schema advertised to the model
    fn spec(&self) -> ToolSpec;

    /// Run the tool and return its textual result
    async fn call(&self, input: ToolInput) -> Result<String, ToolError>;
}

/// Executes tool-call requests on behalf of the turn controller.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, call: &ToolCall) -> Result<String, ToolError>;
}

/// Registry of available tools, keyed by name.
///
/// Only registered tools are advertised in the catalog and dispatchable.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.spec().name;
        debug!("Registering tool '{}'", name);
        self.tools.insert(name, tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Specs of every registered tool, sorted by name
    pub fn catalog(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|tool| tool.spec()).collect()
    }

    pub fn available_tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, call: &ToolCall) -> Result<String, ToolError> {
        debug!("Dispatching tool '{}' with args: {}", call.name, call.arguments);

        let Some(tool) = self.tools.get(&call.name) else {
            warn!("Unknown tool requested: {}", call.name);
            return Err(ToolError::UnknownTool(format!(
                "'{}'. Available tools: {}",
                call.name,
                self.available_tool_names().join(", ")
            )));
        };

        tool.call(ToolInput::new(call.name.clone(), call.arguments.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec::with_string_params("upper", "Uppercase text", &[("text", "Text")])
        }

        async fn call(&self, input: ToolInput) -> Result<String, ToolError> {
            Ok(input.param_str("text")?.to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_dispatch_registered_tool() {
        let registry = ToolRegistry::empty().with_tool(Arc::new(UpperTool));
        let call = ToolCall::new("c1", "upper", json!({"text": "ping"}));

        assert_eq!(registry.execute(&call).await.unwrap(), "PING");
    }

    #[tokio::test]
    async fn test_unknown_tool_lists_available() {
        let registry = ToolRegistry::empty().with_tool(Arc::new(UpperTool));
        let call = ToolCall::new("c1", "launch_rockets", json!({}));

        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(&err, ToolError::UnknownTool(msg) if msg.contains("upper")));
    }

    #[tokio::test]
    async fn test_missing_argument_surfaces_tool_error() {
        let registry = ToolRegistry::empty().with_tool(Arc::new(UpperTool));
        let call = ToolCall::new("c1", "upper", json!({}));

        assert!(matches!(
            registry.execute(&call).await,
            Err(ToolError::MissingParameter(_))
        ));
    }

    #[test]
    fn test_catalog() {
        let registry = ToolRegistry::empty().with_tool(Arc::new(UpperTool));
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert_eq!(registry.catalog()[0].name, "upper");
        assert!(ToolRegistry::empty().catalog().is_empty());
    }
}
