//! Configuration management
//!
//! This module handles loading, validation, and management of the Eva configuration.
//! Configuration is stored in TOML format at ~/.eva/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Default completion provider and per-provider endpoints
//! - **agent**: Turn controller settings (model override, summarization threshold, ...)
//! - **tools**: Web search tool settings
//! - **services**: Summarization and extraction knobs
//!
//! Every section has defaults, so a partial file (or an empty one) is valid.
//!
//! # Examples
//!
//! ```no_run
//! use eva_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Default provider: {}", config.llm.default_provider);
//! println!("Summarize after {} messages", config.agent.summarization_threshold);
//! # Ok(())
//! # }
//! ```

use eva_sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Completion providers Eva can be pointed at
pub const PROVIDERS: [&str; 3] = ["anthropic", "openai", "ollama"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Completion provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Turn controller configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool configuration
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Summarization and extraction services
    #[serde(default)]
    pub services: ServicesConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LLMConfig {
    /// Default LLM provider (anthropic, openai, ollama)
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Anthropic provider settings
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// OpenAI-compatible provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            anthropic: AnthropicConfig::default(),
            openai: OpenAIConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// Anthropic provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnthropicConfig {
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    #[serde(default = "default_anthropic_model")]
    pub model: String,
    // Note: API key comes from $ANTHROPIC_API_KEY or the OS keychain
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAIConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,
    // Note: API key comes from $OPENAI_API_KEY or the OS keychain
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// What compaction does when the model returns an empty summary
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmptySummaryPolicy {
    /// Keep the folded messages and the previous summary; retry next turn
    #[default]
    Retain,
    /// Drop the folded messages anyway; the previous summary stays
    Drop,
}

/// Turn controller configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Overrides the provider's model when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Sampling temperature for conversation turns (0.0-1.0)
    #[serde(default = "default_agent_temperature")]
    pub temperature: f32,

    /// Message count above which the oldest messages are folded into the summary
    #[serde(default = "default_summarization_threshold")]
    pub summarization_threshold: usize,

    /// System preamble placed before every conversation
    #[serde(default = "default_system_preamble")]
    pub system_preamble: String,

    /// Maximum tool dispatch rounds in one turn
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Timeout for each completion call, in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Completion token limit for conversation turns
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub empty_summary_policy: EmptySummaryPolicy,

    /// Estimated prompt size that triggers a warning
    #[serde(default = "default_context_warn_tokens")]
    pub context_warn_tokens: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: None,
            temperature: default_agent_temperature(),
            summarization_threshold: default_summarization_threshold(),
            system_preamble: default_system_preamble(),
            max_tool_iterations: default_max_tool_iterations(),
            llm_timeout_secs: default_llm_timeout_secs(),
            max_tokens: default_max_tokens(),
            empty_summary_policy: EmptySummaryPolicy::default(),
            context_warn_tokens: default_context_warn_tokens(),
        }
    }
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolsConfig {
    /// Enable the Tavily web search tool
    #[serde(default = "default_true")]
    pub web_search: bool,

    #[serde(default = "default_web_search_max_results")]
    pub web_search_max_results: u32,

    #[serde(default = "default_tavily_base_url")]
    pub tavily_base_url: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            web_search: true,
            web_search_max_results: default_web_search_max_results(),
            tavily_base_url: default_tavily_base_url(),
        }
    }
}

/// Summarization and extraction service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicesConfig {
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,

    #[serde(default = "default_title_temperature")]
    pub title_temperature: f32,

    #[serde(default = "default_extraction_temperature")]
    pub extraction_temperature: f32,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks, in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,

    #[serde(default = "default_merge_max_tokens")]
    pub merge_max_tokens: u32,

    #[serde(default = "default_title_max_tokens")]
    pub title_max_tokens: u32,

    #[serde(default = "default_extraction_max_tokens")]
    pub extraction_max_tokens: u32,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            summary_temperature: default_summary_temperature(),
            title_temperature: default_title_temperature(),
            extraction_temperature: default_extraction_temperature(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            summary_max_tokens: default_summary_max_tokens(),
            merge_max_tokens: default_merge_max_tokens(),
            title_max_tokens: default_title_max_tokens(),
            extraction_max_tokens: default_extraction_max_tokens(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_agent_temperature() -> f32 {
    0.7
}

fn default_summarization_threshold() -> usize {
    10
}

fn default_system_preamble() -> String {
    "You are Eva, a thoughtful assistant. Answer clearly and concisely. \
     Use the search tool when a question needs current information."
        .to_string()
}

fn default_max_tool_iterations() -> usize {
    8
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_context_warn_tokens() -> usize {
    12_000
}

fn default_web_search_max_results() -> u32 {
    2
}

fn default_tavily_base_url() -> String {
    "https://api.tavily.com".to_string()
}

fn default_summary_temperature() -> f32 {
    0.4
}

fn default_title_temperature() -> f32 {
    0.3
}

fn default_extraction_temperature() -> f32 {
    0.7
}

fn default_chunk_size() -> usize {
    6000
}

fn default_chunk_overlap() -> usize {
    500
}

fn default_summary_max_tokens() -> u32 {
    1000
}

fn default_merge_max_tokens() -> u32 {
    2000
}

fn default_title_max_tokens() -> u32 {
    80
}

fn default_extraction_max_tokens() -> u32 {
    4000
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.eva/config.toml)
    ///
    /// If the configuration file doesn't exist, writes a default configuration
    /// there first.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, TOML parsing
    /// fails, or validation fails.
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;
        Self::load_or_create_at(&config_path)
    }

    /// Same as [`Config::load_or_create`] for an explicit path
    pub fn load_or_create_at(path: &Path) -> Result<Self, EngineError> {
        if path.exists() {
            Self::load_from_path(path)
        } else {
            Self::create_default(path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default();
        config.validate()?;

        fs::write(path, config.to_toml_string()?)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {}", path.display());
        Ok(config)
    }

    /// Get the default configuration file path (~/.eva/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".eva").join("config.toml"))
    }

    /// Validate field ranges and enumerations
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                PROVIDERS.join(", ")
            )));
        }

        let temperatures = [
            ("agent.temperature", self.agent.temperature),
            ("services.summary_temperature", self.services.summary_temperature),
            ("services.title_temperature", self.services.title_temperature),
            ("services.extraction_temperature", self.services.extraction_temperature),
        ];
        for (name, value) in temperatures {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::Config(format!(
                    "{} must be between 0.0 and 1.0",
                    name
                )));
            }
        }

        if self.agent.summarization_threshold == 0 {
            return Err(EngineError::Config(
                "agent.summarization_threshold must be greater than 0".to_string(),
            ));
        }
        if self.agent.max_tool_iterations == 0 {
            return Err(EngineError::Config(
                "agent.max_tool_iterations must be greater than 0".to_string(),
            ));
        }
        if self.agent.llm_timeout_secs == 0 {
            return Err(EngineError::Config(
                "agent.llm_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if matches!(self.agent.model.as_deref(), Some(m) if m.trim().is_empty()) {
            return Err(EngineError::Config(
                "agent.model must not be empty when set".to_string(),
            ));
        }

        if self.tools.web_search_max_results == 0 {
            return Err(EngineError::Config(
                "tools.web_search_max_results must be greater than 0".to_string(),
            ));
        }

        if self.services.chunk_size == 0 || self.services.chunk_overlap >= self.services.chunk_size {
            return Err(EngineError::Config(format!(
                "services.chunk_overlap ({}) must be smaller than services.chunk_size ({})",
                self.services.chunk_overlap, self.services.chunk_size
            )));
        }

        Ok(())
    }

    /// Model identifier the conversation turns will use
    pub fn effective_model(&self) -> &str {
        if let Some(model) = self.agent.model.as_deref() {
            return model;
        }
        match self.llm.default_provider.as_str() {
            "openai" => &self.llm.openai.model,
            "ollama" => &self.llm.ollama.model,
            _ => &self.llm.anthropic.model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.default_provider, "anthropic");
        assert_eq!(config.agent.summarization_threshold, 10);
        assert_eq!(config.agent.empty_summary_policy, EmptySummaryPolicy::Retain);
        assert_eq!(config.tools.web_search_max_results, 2);
        assert_eq!(config.services.chunk_size, 6000);
        assert_eq!(config.services.chunk_overlap, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_agent_section() {
        let config = Config::from_toml_str(
            r#"
            [agent]
            model = "claude-3-haiku-20240307"
            summarization_threshold = 4
            empty_summary_policy = "drop"
            "#,
        )
        .unwrap();

        assert_eq!(config.agent.summarization_threshold, 4);
        assert_eq!(config.agent.empty_summary_policy, EmptySummaryPolicy::Drop);
        assert_eq!(config.agent.max_tool_iterations, 8);
        assert_eq!(config.effective_model(), "claude-3-haiku-20240307");
    }

    #[test]
    fn test_effective_model_follows_provider() {
        let mut config = Config::default();
        config.llm.default_provider = "ollama".to_string();
        assert_eq!(config.effective_model(), "llama3.1:8b");
    }

    #[test]
    fn test_invalid_provider_rejected() {
        let result = Config::from_toml_str("[llm]\ndefault_provider = \"gemini\"\n");
        assert!(matches!(result, Err(EngineError::Config(msg)) if msg.contains("gemini")));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let result = Config::from_toml_str("[agent]\nsummarization_threshold = 0\n");
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_temperature_out_of_range_rejected() {
        let result = Config::from_toml_str("[agent]\ntemperature = 1.5\n");
        assert!(matches!(result, Err(EngineError::Config(msg)) if msg.contains("agent.temperature")));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let result = Config::from_toml_str("[services]\nchunk_size = 100\nchunk_overlap = 100\n");
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_blank_model_override_rejected() {
        let result = Config::from_toml_str("[agent]\nmodel = \"  \"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = config.to_toml_string().unwrap();

        let deserialized = Config::from_toml_str(&toml_string).unwrap();
        assert_eq!(config, deserialized);
    }
}
