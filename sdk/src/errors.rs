//! Error types and handling
//!
//! This module provides the error types used throughout the Eva engine.
//! All errors implement the `EvaErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never carry API keys. Provider error bodies are scrubbed
//! by the engine before they reach this type.

use thiserror::Error;

/// Trait for Eva error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait EvaErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to show in a chat reply and does not contain
    /// secrets or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried on a later turn. Non-recoverable
    /// errors require a configuration change or restart.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Completion**: provider failures, timeouts, runaway tool loops
/// - **Compaction**: the summarization step of a turn failed
/// - **Secrets**: keychain and environment lookups
///
/// # Examples
///
/// ```
/// use eva_sdk::errors::{EngineError, EvaErrorExt};
///
/// let error = EngineError::LLMTimeout;
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::MissingSecret("anthropic_api_key".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Completion errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("LLM call timed out")]
    LLMTimeout,

    #[error("Tool loop exceeded: model requested tools for {limit} consecutive rounds")]
    ToolLoopExceeded { limit: usize },

    // Compaction errors
    #[error("Compaction failed: {0}")]
    CompactionFailed(String),

    // Service errors
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Secret errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    #[error("Missing secret: {0}")]
    MissingSecret(String),
}

impl EvaErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::LLMProvider(_) => "The language model is unavailable. Check your API keys and network",
            Self::LLMTimeout => "The language model took too long to respond. Try again",
            Self::ToolLoopExceeded { .. } => {
                "The assistant got stuck calling tools. Try rephrasing the request"
            }

            Self::CompactionFailed(_) => "Conversation history could not be summarized yet",

            Self::Extraction(_) => "Text processing failed. Try a shorter input",
            Self::InvalidInput(_) => "The request was malformed",

            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::MissingSecret(_) => "An API key is missing. Set it in the environment or keychain",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) | Self::MissingSecret(_) | Self::KeyringError(_) => false,

            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::ToolLoopExceeded { limit: 10 };
        assert_eq!(
            err.to_string(),
            "Tool loop exceeded: model requested tools for 10 consecutive rounds"
        );

        let err = EngineError::CompactionFailed("boom".to_string());
        assert_eq!(err.to_string(), "Compaction failed: boom");
    }

    #[test]
    fn test_recoverability() {
        assert!(EngineError::LLMTimeout.is_recoverable());
        assert!(EngineError::LLMProvider("down".to_string()).is_recoverable());
        assert!(EngineError::CompactionFailed("x".to_string()).is_recoverable());
        assert!(!EngineError::Config("bad".to_string()).is_recoverable());
        assert!(!EngineError::MissingSecret("k".to_string()).is_recoverable());
    }
}
