//! Document summarization
//!
//! Long text is chunked, each chunk summarized, the partial summaries merged
//! into one, and a short title generated from the result.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::chunking::chunk_text;
use crate::config::ServicesConfig;
use crate::llm::{self, GenerationOptions, LLMProvider, Message};
use crate::secrets;
use eva_sdk::errors::EngineError;

const SUMMARY_PROMPT: &str = "You are a highly skilled editor. Create a detailed analysis that captures the key points \
     and main ideas of the following journal entry text while improving flow and clarity. \
     The user is journaling in a stream of consciousness style. journal entry: ";

const MERGE_PROMPT: &str = "You are a skilled editor merging multiple summaries into a single coherent document. \
     Maintain the key points while ensuring smooth transitions and avoiding redundancy. \
     Below are summaries of different parts of a longer document. \
     Please merge them into a single coherent summary:";

const TITLE_PROMPT: &str = "Generate a short, descriptive title (max 50 characters) that captures the main topic \
     or theme of the text. The title should be concise but informative. Text:";

/// Chunk summaries requested concurrently
const CHUNK_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub title: String,
    pub summary: String,
}

pub struct SummarizationService {
    provider: Arc<dyn LLMProvider>,
    config: ServicesConfig,
    model: Option<String>,
}

impl SummarizationService {
    pub fn new(provider: Arc<dyn LLMProvider>, config: ServicesConfig) -> Self {
        Self {
            provider,
            config,
            model: None,
        }
    }

    /// Use a model other than the provider default
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    async fn complete(&self, prompt: String, temperature: f32, max_tokens: u32) -> Result<String> {
        let options = GenerationOptions::new(temperature, max_tokens).with_model(self.model.clone());
        llm::complete_text(self.provider.as_ref(), &[Message::user(prompt)], &options)
            .await
            .map_err(|e| EngineError::LLMProvider(secrets::scrub(&e.to_string())).into())
    }

    /// Short title for `text`
    pub async fn generate_title(&self, text: &str) -> Result<String> {
        let title = self
            .complete(
                format!("{}{}", TITLE_PROMPT, text),
                self.config.title_temperature,
                self.config.title_max_tokens,
            )
            .await
            .context("Failed to generate title")?;
        Ok(title.trim().to_string())
    }

    /// Summarize `text` and title the result
    pub async fn generate_summary(&self, text: &str) -> Result<DocumentSummary> {
        if text.trim().is_empty() {
            return Err(EngineError::InvalidInput("nothing to summarize".to_string()).into());
        }

        let chunks = chunk_text(text, self.config.chunk_size, self.config.chunk_overlap);
        info!("Summarizing {} characters in {} chunk(s)", text.chars().count(), chunks.len());

        let chunk_summaries: Vec<String> = stream::iter(chunks.into_iter().enumerate())
            .map(|(index, chunk)| async move { self.summarize_chunk(&chunk, index).await })
            .buffered(CHUNK_CONCURRENCY)
            .try_collect()
            .await?;

        let summary = if chunk_summaries.len() == 1 {
            chunk_summaries.into_iter().next().unwrap_or_default()
        } else {
            self.merge_summaries(&chunk_summaries).await?
        };

        let title = self.generate_title(&summary).await?;
        debug!("Title generated: {}", title);

        Ok(DocumentSummary { title, summary })
    }

    async fn summarize_chunk(&self, chunk: &str, index: usize) -> Result<String> {
        debug!("Summarizing chunk {} ({} chars)", index + 1, chunk.chars().count());
        self.complete(
            format!("{}{}", SUMMARY_PROMPT, chunk),
            self.config.summary_temperature,
            self.config.summary_max_tokens,
        )
        .await
        .with_context(|| format!("Failed to summarize chunk {}", index + 1))
    }

    async fn merge_summaries(&self, summaries: &[String]) -> Result<String> {
        debug!("Merging {} summaries", summaries.len());
        self.complete(
            format!("{}\n\n{}", MERGE_PROMPT, number_parts(summaries)),
            self.config.summary_temperature,
            self.config.merge_max_tokens,
        )
        .await
        .context("Failed to merge summaries")
    }
}

/// `Part 1:\n...\n\nPart 2:\n...`
fn number_parts(summaries: &[String]) -> String {
    summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Part {}:\n{}", i + 1, s))
        .collect::<Vec<_>>()
        .join("\n\n")
}
