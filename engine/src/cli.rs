//! CLI interface for Eva
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Eva conversational assistant
///
/// Chats through a completion provider with bounded memory, summarizes
/// documents and extracts atomic ideas from text.
#[derive(Parser, Debug)]
#[command(name = "eva")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive conversation (/summary, /reset, /quit)
    Chat {
        /// Conversation thread id
        #[arg(long, default_value = "default")]
        thread: String,

        /// Author label prefixed to each message
        #[arg(long)]
        author: Option<String>,
    },

    /// Send a single message and print the reply
    Ask {
        /// The message to send
        message: String,

        /// Conversation thread id
        #[arg(long, default_value = "default")]
        thread: String,

        /// Author label prefixed to the message
        #[arg(long)]
        author: Option<String>,
    },

    /// Summarize a text file ("-" reads stdin) and give it a title
    Summarize {
        /// Input file, or "-" for stdin
        input: PathBuf,
    },

    /// Extract scored atomic ideas from a text file ("-" reads stdin)
    Extract {
        /// Input file, or "-" for stdin
        input: PathBuf,

        /// Print one parsed item per line instead of the joined string
        #[arg(long)]
        items: bool,
    },

    /// Run system diagnostics
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Print the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["eva", "doctor"]);
        assert!(matches!(cli.command, Command::Doctor));
        assert!(!cli.json);
        assert!(cli.log.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["eva", "--json", "--log", "debug", "doctor"]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["eva", "ask", "hi", "--json", "--config", "/tmp/eva.toml"]);
        assert!(cli.json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/eva.toml")));
    }

    #[test]
    fn test_ask_command_defaults() {
        let cli = Cli::parse_from(["eva", "ask", "what is the weather?"]);
        if let Command::Ask { message, thread, author } = cli.command {
            assert_eq!(message, "what is the weather?");
            assert_eq!(thread, "default");
            assert!(author.is_none());
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_chat_with_thread_and_author() {
        let cli = Cli::parse_from(["eva", "chat", "--thread", "channel-42", "--author", "alice"]);
        if let Command::Chat { thread, author } = cli.command {
            assert_eq!(thread, "channel-42");
            assert_eq!(author, Some("alice".to_string()));
        } else {
            panic!("Expected Chat command");
        }
    }

    #[test]
    fn test_extract_stdin_items() {
        let cli = Cli::parse_from(["eva", "extract", "-", "--items"]);
        if let Command::Extract { input, items } = cli.command {
            assert_eq!(input, PathBuf::from("-"));
            assert!(items);
        } else {
            panic!("Expected Extract command");
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["eva", "config", "path"]);
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Path
            }
        ));
    }
}
