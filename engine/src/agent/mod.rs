//! Conversation turn engine
//!
//! This module drives conversations: per-thread memory with a rolling summary,
//! the turn state machine that calls the completion provider and tools, and
//! the session manager that serializes turns per thread.

pub mod compaction;
pub mod controller;
pub mod memory;
pub mod session;

pub use compaction::{compact, CompactionOutcome};
pub use controller::{CompactionStatus, IncomingMessage, TurnConfig, TurnController, TurnResult};
pub use memory::ConversationMemory;
pub use session::{SessionManager, SharedMemory, TurnReply, TurnStatus};
