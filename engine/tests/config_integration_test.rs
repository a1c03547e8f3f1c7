//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be loaded from disk,
//! created with defaults when missing, and validated.

use eva_engine::config::{Config, EmptySummaryPolicy};
use eva_sdk::errors::EngineError;
use std::fs;

#[test]
fn test_config_toml_parsing() {
    let toml_content = r#"
[core]
log_level = "debug"

[llm]
default_provider = "ollama"

[llm.ollama]
base_url = "http://gpu-box:11434"
model = "qwen2.5:14b"

[llm.anthropic]
model = "claude-3-5-haiku-20241022"

[agent]
model = "qwen2.5:7b"
temperature = 0.3
summarization_threshold = 6
system_preamble = "You are a terse assistant."
max_tool_iterations = 4
llm_timeout_secs = 30
empty_summary_policy = "drop"

[tools]
web_search = false
web_search_max_results = 5

[services]
chunk_size = 3000
chunk_overlap = 200
"#;

    let config = Config::from_toml_str(toml_content).expect("Failed to parse config");

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.default_provider, "ollama");
    assert_eq!(config.llm.ollama.base_url, "http://gpu-box:11434");
    assert_eq!(config.llm.anthropic.model, "claude-3-5-haiku-20241022");
    // unspecified provider sections keep their defaults
    assert_eq!(config.llm.openai.base_url, "https://api.openai.com/v1");

    assert_eq!(config.agent.summarization_threshold, 6);
    assert_eq!(config.agent.max_tool_iterations, 4);
    assert_eq!(config.agent.llm_timeout_secs, 30);
    assert_eq!(config.agent.empty_summary_policy, EmptySummaryPolicy::Drop);
    assert_eq!(config.agent.max_tokens, 4096);
    assert_eq!(config.effective_model(), "qwen2.5:7b");

    assert!(!config.tools.web_search);
    assert_eq!(config.tools.web_search_max_results, 5);
    assert_eq!(config.services.chunk_size, 3000);
    assert_eq!(config.services.summary_max_tokens, 1000);
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = Config::from_toml_str("").expect("Empty config should be valid");
    assert_eq!(config, Config::default());
    assert_eq!(config.agent.summarization_threshold, 10);
    assert_eq!(config.agent.empty_summary_policy, EmptySummaryPolicy::Retain);
    assert_eq!(config.effective_model(), config.llm.anthropic.model);
}

#[test]
fn test_load_or_create_writes_default_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let created = Config::load_or_create_at(&path).expect("Failed to create config");
    assert!(path.exists());

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("[agent]"));
    assert!(written.contains("summarization_threshold = 10"));

    let reloaded = Config::load_or_create_at(&path).expect("Failed to reload config");
    assert_eq!(created, reloaded);
}

#[test]
fn test_load_existing_file_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[agent]\nsummarization_threshold = 3\n").unwrap();

    let config = Config::load_or_create_at(&path).unwrap();

    assert_eq!(config.agent.summarization_threshold, 3);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "[agent]\nsummarization_threshold = 3\n"
    );
}

#[test]
fn test_invalid_log_level_detection() {
    let err = Config::from_toml_str("[core]\nlog_level = \"loud\"\n").unwrap_err();
    assert!(matches!(err, EngineError::Config(ref msg) if msg.contains("Invalid log level")));
}

#[test]
fn test_invalid_provider_detection() {
    let err = Config::from_toml_str("[llm]\ndefault_provider = \"gemini\"\n").unwrap_err();
    assert!(matches!(err, EngineError::Config(ref msg) if msg.contains("gemini")));
}

#[test]
fn test_out_of_range_values_are_rejected() {
    let cases = [
        "[agent]\ntemperature = 1.5\n",
        "[agent]\nsummarization_threshold = 0\n",
        "[agent]\nmax_tool_iterations = 0\n",
        "[agent]\nllm_timeout_secs = 0\n",
        "[agent]\nmodel = \"  \"\n",
        "[tools]\nweb_search_max_results = 0\n",
        "[services]\nchunk_size = 100\nchunk_overlap = 100\n",
        "[services]\ntitle_temperature = -0.1\n",
    ];

    for case in cases {
        assert!(
            matches!(Config::from_toml_str(case), Err(EngineError::Config(_))),
            "expected rejection for {:?}",
            case
        );
    }
}

#[test]
fn test_unknown_empty_summary_policy_is_rejected() {
    assert!(Config::from_toml_str("[agent]\nempty_summary_policy = \"maybe\"\n").is_err());
}

#[test]
fn test_malformed_file_reports_path_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[agent\nbroken").unwrap();

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}
