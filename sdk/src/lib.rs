//! Eva SDK
//!
//! Shared library providing error and tool types for Eva components.
//! This crate is used by the engine and by anything that implements tools for it.

/// Error types and handling
pub mod errors;

/// Tool description types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, EvaErrorExt};
pub use types::{ToolError, ToolSpec};
