//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - chat: interactive conversation on one thread
//! - ask: a single turn, printed as text or JSON
//! - summarize / extract: the document services
//! - doctor: validate configuration and check the provider
//! - config: show the effective configuration or its path

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{error, info, warn};

use crate::agent::session::apology_for;
use crate::agent::{IncomingMessage, SessionManager, TurnConfig, TurnController, TurnStatus};
use crate::config::Config;
use crate::llm::anthropic::AnthropicProvider;
use crate::llm::ollama::OllamaProvider;
use crate::llm::openai::OpenAIProvider;
use crate::llm::{LLMProvider, ToolSpec};
use crate::secrets::{self, SecretCache, SecretManager};
use crate::services::{Extraction, ExtractOptions, ExtractionService, SummarizationService};
use crate::tools::{TavilySearchTool, ToolRegistry};

/// Keychain service name for stored API keys
pub const KEYRING_SERVICE: &str = "eva";

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// A session manager wired to the configured provider and tools
pub struct Session {
    pub manager: SessionManager,
    pub catalog: Vec<ToolSpec>,
}

pub fn build_secret_cache() -> Arc<SecretCache> {
    Arc::new(SecretCache::new(Arc::new(SecretManager::new(KEYRING_SERVICE))))
}

/// Construct the provider named by `llm.default_provider`
pub fn build_provider(config: &Config, secret_cache: Arc<SecretCache>) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.llm.default_provider.as_str() {
        "anthropic" => Arc::new(AnthropicProvider::new(config.llm.anthropic.clone(), secret_cache)),
        "openai" => Arc::new(OpenAIProvider::new(config.llm.openai.clone(), secret_cache)),
        "ollama" => Arc::new(OllamaProvider::new(config.llm.ollama.clone())),
        other => bail!("Unknown LLM provider '{}'", other),
    };
    info!("Using provider '{}' with model '{}'", provider.name(), config.effective_model());
    Ok(provider)
}

/// Register the tools enabled in `[tools]`
///
/// Web search is skipped when no Tavily key can be found.
pub fn build_tools(config: &Config, secret_cache: Arc<SecretCache>) -> ToolRegistry {
    let mut registry = ToolRegistry::empty();

    if config.tools.web_search {
        if secret_cache.has_secret(secrets::TAVILY_API_KEY) {
            registry.register(Arc::new(TavilySearchTool::new(&config.tools, secret_cache)));
        } else {
            warn!(
                "Web search is enabled but {} is not set; continuing without it",
                SecretManager::env_var_name(secrets::TAVILY_API_KEY)
            );
        }
    }

    registry
}

pub fn build_session(config: &Config) -> Result<Session> {
    let secret_cache = build_secret_cache();
    let provider = build_provider(config, secret_cache.clone())?;
    let registry = build_tools(config, secret_cache);
    let catalog = registry.catalog();

    let controller = TurnController::new(provider, Arc::new(registry), TurnConfig::from(&config.agent));
    Ok(Session {
        manager: SessionManager::new(Arc::new(controller)),
        catalog,
    })
}

fn incoming(author: Option<&str>, content: &str) -> IncomingMessage {
    match author {
        Some(author) => IncomingMessage::from_author(author, content),
        None => IncomingMessage::new(content),
    }
}

/// Interactive conversation on one thread
///
/// Lines starting with `/` are commands: `/summary` prints the rolling
/// summary, `/reset` clears the thread and `/quit` exits.
pub async fn handle_chat(thread: String, author: Option<String>, config: &Config, format: OutputFormat) -> Result<()> {
    let session = build_session(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if matches!(format, OutputFormat::Text) {
        println!("Eva is listening on thread '{}'. Type /quit to leave.", thread);
    }

    loop {
        if matches!(format, OutputFormat::Text) {
            print!("> ");
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/reset" => {
                session.manager.reset_thread(&thread).await;
                println!("{}", reset_notice(&thread, format));
            }
            "/summary" => {
                let summary = session
                    .manager
                    .snapshot(&thread)
                    .await
                    .and_then(|memory| memory.summary().map(str::to_string));
                match format {
                    OutputFormat::Text => {
                        println!("{}", summary.as_deref().unwrap_or("(no summary yet)"))
                    }
                    OutputFormat::Json => println!("{}", json!({ "summary": summary })),
                }
            }
            content => {
                let reply = session
                    .manager
                    .advance_turn(&thread, incoming(author.as_deref(), content), &session.catalog)
                    .await;
                match format {
                    OutputFormat::Text => println!("{}", reply.reply),
                    OutputFormat::Json => println!("{}", serde_json::to_string(&reply)?),
                }
            }
        }
    }

    session.manager.end_thread(&thread).await;
    Ok(())
}

fn reset_notice(thread: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("Thread '{}' cleared.", thread),
        OutputFormat::Json => json!({ "reset": thread }).to_string(),
    }
}

/// Run a single turn and print the reply
pub async fn handle_ask(
    message: String,
    thread: String,
    author: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let session = build_session(config)?;

    let result = session
        .manager
        .try_advance_turn(&thread, incoming(author.as_deref(), &message), &session.catalog)
        .await;

    match result {
        Ok(result) => {
            match format {
                OutputFormat::Text => println!("{}", result.reply),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            }
            Ok(())
        }
        Err(e) => {
            error!("Turn failed: {:#}", e);
            match format {
                OutputFormat::Text => println!("{}", apology_for(&e)),
                OutputFormat::Json => {
                    let output = json!({
                        "reply": apology_for(&e),
                        "status": TurnStatus::CompletionError,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
            }
            Err(e)
        }
    }
}

/// Read a whole file, or stdin when `input` is `-`
pub async fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read stdin")?;
        return Ok(text);
    }

    tokio::fs::read_to_string(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))
}

pub async fn handle_summarize(input: &Path, config: &Config, format: OutputFormat) -> Result<()> {
    let text = read_input(input).await?;
    let provider = build_provider(config, build_secret_cache())?;
    let service = SummarizationService::new(provider, config.services.clone()).with_model(config.agent.model.clone());

    let document = service.generate_summary(&text).await?;

    match format {
        OutputFormat::Text => {
            println!("{}", document.title);
            println!();
            println!("{}", document.summary);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&document)?),
    }
    Ok(())
}

pub async fn handle_extract(input: &Path, items: bool, config: &Config, format: OutputFormat) -> Result<()> {
    let text = read_input(input).await?;
    let provider = build_provider(config, build_secret_cache())?;
    let service = ExtractionService::atomic_ideas(provider, &config.services)
        .return_parsed_items(items)
        .model(config.agent.model.clone());

    let extraction = service.extract(&text, &ExtractOptions::default()).await?;

    match (format, extraction) {
        (OutputFormat::Json, extraction) => println!("{}", serde_json::to_string_pretty(&extraction)?),
        (OutputFormat::Text, Extraction::Text(text)) => println!("{}", text),
        (OutputFormat::Text, Extraction::Items(items)) => {
            for item in items {
                println!("{}", item.render());
            }
        }
    }
    Ok(())
}

/// Validate configuration, check the provider and report secret presence
pub async fn handle_doctor(config: &Config, config_path: &Path, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    checks.push(("Config file", config_path.display().to_string()));
    match config.validate() {
        Ok(()) => checks.push(("Configuration", "Valid".to_string())),
        Err(e) => {
            checks.push(("Configuration", "Invalid".to_string()));
            issues.push(e.to_string());
        }
    }

    checks.push(("Provider", config.llm.default_provider.clone()));
    checks.push(("Model", config.effective_model().to_string()));

    let secret_cache = build_secret_cache();
    let required_key = match config.llm.default_provider.as_str() {
        "anthropic" => Some(secrets::ANTHROPIC_API_KEY),
        "openai" => Some(secrets::OPENAI_API_KEY),
        _ => None,
    };
    if let Some(key) = required_key {
        if secret_cache.has_secret(key) {
            checks.push(("API key", "Configured".to_string()));
        } else {
            checks.push(("API key", "Not configured".to_string()));
            issues.push(format!(
                "Set {} or store '{}' in the system keychain.",
                SecretManager::env_var_name(key),
                key
            ));
        }
    }

    match build_provider(config, secret_cache.clone()) {
        Ok(provider) => {
            if provider.check_health().await {
                checks.push(("Provider health", "OK".to_string()));
            } else {
                checks.push(("Provider health", "Unreachable".to_string()));
                issues.push(format!("Provider '{}' is not reachable.", provider.name()));
            }
        }
        Err(e) => {
            checks.push(("Provider health", "Error".to_string()));
            issues.push(format!("Cannot build provider: {}", e));
        }
    }

    if config.tools.web_search {
        if secret_cache.has_secret(secrets::TAVILY_API_KEY) {
            checks.push(("Web search", "Enabled".to_string()));
        } else {
            checks.push(("Web search", "Missing key".to_string()));
            issues.push(format!(
                "Web search is enabled but {} is not set.",
                SecretManager::env_var_name(secrets::TAVILY_API_KEY)
            ));
        }
    } else {
        checks.push(("Web search", "Disabled".to_string()));
    }

    checks.push((
        "Build",
        format!(
            "{} ({} - {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_COMMIT_HASH"),
            env!("BUILD_TIMESTAMP")
        ),
    ));

    match format {
        OutputFormat::Text => {
            println!("Eva System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<20} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

pub fn handle_config_path(config_path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", config_path.display()),
        OutputFormat::Json => println!("{}", json!({ "path": config_path })),
    }
    Ok(())
}
