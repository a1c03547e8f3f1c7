//! Web search through the Tavily REST API
//!
//! Exposed to the model as `tavily_search`. Results come back as a JSON array
//! of `{url, content}` objects, which models read well as a tool result.

use super::Tool;
use crate::config::ToolsConfig;
use crate::secrets::{self, SecretCache};
use async_trait::async_trait;
use eva_sdk::types::{ToolError, ToolInput, ToolSpec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const TOOL_NAME: &str = "tavily_search";

pub struct TavilySearchTool {
    base_url: String,
    max_results: u32,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize, Serialize)]
struct SearchHit {
    url: String,
    #[serde(default)]
    content: String,
}

impl TavilySearchTool {
    pub fn new(config: &ToolsConfig, secret_cache: Arc<SecretCache>) -> Self {
        Self {
            base_url: config.tavily_base_url.trim_end_matches('/').to_string(),
            max_results: config.web_search_max_results,
            secret_cache,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::with_string_params(
            TOOL_NAME,
            "A search engine optimized for comprehensive, accurate, and trusted results. \
             Useful for when you need to answer questions about current events. \
             Input should be a search query.",
            &[("query", "search query to look up")],
        )
    }

    async fn call(&self, input: ToolInput) -> Result<String, ToolError> {
        let query = input.param_str("query")?;
        if query.trim().is_empty() {
            return Err(ToolError::InvalidParameter("query must not be empty".to_string()));
        }

        let api_key = self
            .secret_cache
            .get_secret(secrets::TAVILY_API_KEY)
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let max_results = input
            .param_i64_opt("max_results")
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .unwrap_or(self.max_results);

        tracing::debug!("Tavily search: query_len={}, max_results={}", query.len(), max_results);

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&SearchRequest {
                api_key: api_key.expose(),
                query: &query,
                max_results,
            })
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("search request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Execution(format!(
                "search returned {}: {}",
                status,
                secrets::scrub(&body)
            )));
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Execution(format!("invalid search response: {}", e)))?;

        serde_json::to_string(&data.results)
            .map_err(|e| ToolError::Execution(format!("failed to encode results: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretManager;
    use serde_json::json;

    fn tool() -> TavilySearchTool {
        let cache = SecretCache::with_values(Arc::new(SecretManager::new("eva-test")), [(secrets::TAVILY_API_KEY, "tvly-test")]);
        TavilySearchTool::new(&ToolsConfig::default(), Arc::new(cache))
    }

    #[test]
    fn test_spec_shape() {
        let spec = tool().spec();
        assert_eq!(spec.name, "tavily_search");
        assert_eq!(spec.parameters["required"], json!(["query"]));
    }

    #[tokio::test]
    async fn test_blank_query_rejected_before_network() {
        let err = tool()
            .call(ToolInput::new(TOOL_NAME, json!({"query": "   "})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_missing_query() {
        let err = tool().call(ToolInput::new(TOOL_NAME, json!({}))).await.unwrap_err();
        assert!(matches!(err, ToolError::MissingParameter(_)));
    }
}
