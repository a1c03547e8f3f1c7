//! Session Manager
//!
//! Owns the memory of every thread for the process lifetime. Each thread's
//! memory sits behind its own async mutex, held for a whole turn, so turns on
//! one thread are serialized while different threads run in parallel.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::llm::ToolSpec;
use eva_sdk::errors::{EngineError, EvaErrorExt};

use super::controller::{IncomingMessage, TurnController, TurnResult};
use super::memory::ConversationMemory;

pub type SharedMemory = Arc<Mutex<ConversationMemory>>;

const APOLOGY: &str = "Sorry, I couldn't come up with a reply just now.";

/// Appended when retrying cannot succeed without a configuration change
const NEEDS_FIX: &str = "Retrying won't help until this is fixed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Success,
    CompletionError,
}

/// Reply handed back to a chat front-end
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub reply: String,
    pub status: TurnStatus,
}

pub struct SessionManager {
    controller: Arc<TurnController>,
    threads: Mutex<HashMap<String, SharedMemory>>,
}

impl SessionManager {
    pub fn new(controller: Arc<TurnController>) -> Self {
        Self {
            controller,
            threads: Mutex::new(HashMap::new()),
        }
    }

    /// Memory handle for `thread_id`, created empty on first use
    pub async fn get_or_create(&self, thread_id: &str) -> SharedMemory {
        let mut threads = self.threads.lock().await;
        threads
            .entry(thread_id.to_string())
            .or_insert_with(|| {
                debug!("Creating memory for thread '{}'", thread_id);
                Arc::new(Mutex::new(ConversationMemory::new(thread_id)))
            })
            .clone()
    }

    /// Copy of a thread's memory; waits for any in-flight turn on it
    pub async fn snapshot(&self, thread_id: &str) -> Option<ConversationMemory> {
        let memory = self.threads.lock().await.get(thread_id).cloned()?;
        let guard = memory.lock().await;
        Some(guard.clone())
    }

    /// Forget a thread. Returns false if it was unknown.
    ///
    /// A turn already running on the thread finishes against the detached memory.
    pub async fn end_thread(&self, thread_id: &str) -> bool {
        let removed = self.threads.lock().await.remove(thread_id).is_some();
        if removed {
            info!("Ended thread '{}'", thread_id);
        }
        removed
    }

    /// Clear a thread's messages and summary, keeping the thread registered
    pub async fn reset_thread(&self, thread_id: &str) -> bool {
        let Some(memory) = self.threads.lock().await.get(thread_id).cloned() else {
            return false;
        };
        memory.lock().await.clear();
        info!("Reset thread '{}'", thread_id);
        true
    }

    pub async fn thread_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.threads.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run one turn on `thread_id`, propagating failures
    pub async fn try_advance_turn(
        &self,
        thread_id: &str,
        message: IncomingMessage,
        catalog: &[ToolSpec],
    ) -> Result<TurnResult> {
        let memory = self.get_or_create(thread_id).await;
        let mut guard = memory.lock().await;
        self.controller.advance_turn(&mut guard, message, catalog).await
    }

    /// Run one turn on `thread_id`; failures become an apologetic reply
    pub async fn advance_turn(
        &self,
        thread_id: &str,
        message: IncomingMessage,
        catalog: &[ToolSpec],
    ) -> TurnReply {
        match self.try_advance_turn(thread_id, message, catalog).await {
            Ok(result) => TurnReply {
                reply: result.reply,
                status: TurnStatus::Success,
            },
            Err(e) => TurnReply {
                reply: apology_for(&e),
                status: TurnStatus::CompletionError,
            },
        }
    }
}

/// Apology plus the user hint of the underlying engine error, if any
pub fn apology_for(err: &anyhow::Error) -> String {
    match err.downcast_ref::<EngineError>() {
        Some(engine_err) if engine_err.is_recoverable() => format!("{} {}", APOLOGY, engine_err.user_hint()),
        Some(engine_err) => format!("{} {} {}", APOLOGY, engine_err.user_hint(), NEEDS_FIX),
        None => APOLOGY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apology_includes_hint() {
        let err = anyhow::Error::new(EngineError::LLMTimeout).context("turn failed");
        let text = apology_for(&err);
        assert!(text.starts_with(APOLOGY));
        assert!(text.len() > APOLOGY.len());
        assert!(!text.ends_with(NEEDS_FIX));
    }

    #[test]
    fn test_unrecoverable_apology_says_so() {
        let err = anyhow::Error::new(EngineError::MissingSecret("openai_api_key".to_string()));
        let text = apology_for(&err);
        assert!(text.contains("An API key is missing"));
        assert!(text.ends_with(NEEDS_FIX));
        assert!(!text.contains("openai_api_key"));
    }

    #[test]
    fn test_apology_without_engine_error() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(apology_for(&err), APOLOGY);
    }
}
