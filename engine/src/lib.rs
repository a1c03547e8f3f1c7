//! Eva Engine Library
//!
//! This library provides the core functionality of Eva: the turn controller,
//! its memory and compaction, the completion providers and the text services.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// LLM provider abstraction layer
pub mod llm;

/// Turn controller, memory and session management
pub mod agent;

/// Tools the completion model can call
pub mod tools;

/// Summarization and extraction services
pub mod services;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
