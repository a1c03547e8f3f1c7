// Eva conversational assistant
// Main entry point for the eva binary

use clap::Parser;
use eva_engine::cli::{Cli, Command, ConfigAction};
use eva_engine::config::Config;
use eva_engine::handlers::{
    handle_ask, handle_chat, handle_config_path, handle_config_show, handle_doctor, handle_extract,
    handle_summarize, OutputFormat,
};
use eva_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration before telemetry so the configured level applies
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = Config::load_or_create_at(&config_path)?;

    let level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Eva v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Chat { thread, author } => {
            tracing::info!("Starting chat on thread '{}'", thread);
            handle_chat(thread, author, &config, format).await
        }

        Command::Ask {
            message,
            thread,
            author,
        } => {
            tracing::info!("Asking on thread '{}'", thread);
            handle_ask(message, thread, author, &config, format).await
        }

        Command::Summarize { input } => {
            tracing::info!("Summarizing {}", input.display());
            handle_summarize(&input, &config, format).await
        }

        Command::Extract { input, items } => {
            tracing::info!("Extracting atomic ideas from {}", input.display());
            handle_extract(&input, items, &config, format).await
        }

        Command::Doctor => {
            tracing::info!("Running diagnostics...");
            handle_doctor(&config, &config_path, format).await
        }

        Command::Config { action } => {
            tracing::info!("Config management: {:?}", action);
            match action {
                ConfigAction::Show => handle_config_show(&config, format),
                ConfigAction::Path => handle_config_path(&config_path, format),
            }
        }
    }
}
