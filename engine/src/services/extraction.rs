//! Prompt-driven item extraction
//!
//! Sends a prompt plus content to the provider and splits the reply into
//! items on a separator. Items may carry a trailing importance score in the
//! form `text |N|`.
//!
//! Incremental extraction reuses earlier results: when both previous text and
//! previous results are given, the incremental prompt is filled from the
//! `{previous_text}`, `{new_text}` and `{previous_results}` placeholders.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use crate::config::ServicesConfig;
use crate::llm::{self, GenerationOptions, LLMProvider, Message};
use crate::secrets;
use eva_sdk::errors::EngineError;

pub const DEFAULT_SEPARATOR: &str = ":::";

const ATOMIC_IDEAS_PROMPT: &str = r#"Extract the key atomic ideas from this text. Each idea should be self-contained complete and concise. After each idea, rate its importance from 1-5 where 5 is most critical to the text's meaning. Separate ideas with three colons (:::). Focus on unique, non-redundant ideas. Format as: [idea] |[score]|

Example usage on a text:
SpaceX launched their new rocket yesterday, marking their 100th successful mission. The launch was delayed three times due to weather.

Would output:
SpaceX completed their 100th successful mission|5|:::The latest launch happened yesterday|2|:::Weather caused three launch delays|1|"#;

static SCORE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn score_pattern() -> &'static Regex {
    SCORE_PATTERN.get_or_init(|| Regex::new(r"^(.*?)\s*\|(\d+)\|\s*$").expect("Invalid score pattern"))
}

const TRAILING_PUNCTUATION: [char; 4] = ['.', ',', '!', '?'];

/// One extracted item with its importance score (0 when none was given)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub text: String,
    pub score: u32,
}

impl ScoredItem {
    pub fn new(text: impl Into<String>, score: u32) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }

    /// `text |score|`
    pub fn render(&self) -> String {
        format!("{} |{}|", self.text, self.score)
    }
}

/// Result of an extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Extraction {
    Text(String),
    Items(Vec<ScoredItem>),
}

/// Earlier state for incremental extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub previous_text: String,
    pub previous_results: Vec<ScoredItem>,
}

pub struct ExtractionService {
    provider: Arc<dyn LLMProvider>,
    name: String,
    prompt: String,
    incremental_prompt: Option<String>,
    separator: String,
    parse_score: bool,
    return_parsed_items: bool,
    temperature: f32,
    max_tokens: u32,
    model: Option<String>,
}

impl ExtractionService {
    pub fn new(provider: Arc<dyn LLMProvider>, name: impl Into<String>, prompt: impl Into<String>) -> Self {
        let defaults = ServicesConfig::default();
        Self {
            provider,
            name: name.into(),
            prompt: prompt.into(),
            incremental_prompt: None,
            separator: DEFAULT_SEPARATOR.to_string(),
            parse_score: false,
            return_parsed_items: false,
            temperature: defaults.extraction_temperature,
            max_tokens: defaults.extraction_max_tokens,
            model: None,
        }
    }

    /// Scored atomic-idea extractor
    pub fn atomic_ideas(provider: Arc<dyn LLMProvider>, config: &ServicesConfig) -> Self {
        Self::new(provider, "Atomic Ideas", ATOMIC_IDEAS_PROMPT)
            .parse_score(true)
            .temperature(config.extraction_temperature)
            .max_tokens(config.extraction_max_tokens)
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn parse_score(mut self, parse_score: bool) -> Self {
        self.parse_score = parse_score;
        self
    }

    pub fn return_parsed_items(mut self, return_parsed_items: bool) -> Self {
        self.return_parsed_items = return_parsed_items;
        self
    }

    pub fn incremental_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.incremental_prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full prompt for `text`, and whether it is an incremental one
    pub fn build_prompt(&self, text: &str, options: &ExtractOptions) -> (String, bool) {
        let is_incremental = !options.previous_text.is_empty() && !options.previous_results.is_empty();

        if !is_incremental {
            return (format!("{}\n\nContent:\n{}", self.prompt, text), false);
        }

        let template = self.incremental_prompt.as_deref().unwrap_or(&self.prompt);
        let previous_results = options
            .previous_results
            .iter()
            .map(|item| if self.parse_score { item.render() } else { item.text.clone() })
            .collect::<Vec<_>>()
            .join(&self.separator);

        let prompt = template
            .replace("{previous_text}", &options.previous_text)
            .replace("{new_text}", text)
            .replace("{previous_results}", &previous_results);
        (prompt, true)
    }

    /// Split a raw reply into scored items
    pub fn parse_items(&self, raw: &str) -> Vec<ScoredItem> {
        let cleaned = raw.trim().trim_end_matches(TRAILING_PUNCTUATION);

        let items: Vec<ScoredItem> = cleaned
            .split(self.separator.as_str())
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(parse_item_with_score)
            .filter(|item| {
                if item.text.is_empty() {
                    warn!("[{}] Filtered out item without text", self.name);
                    false
                } else {
                    true
                }
            })
            .collect();

        if items.is_empty() {
            warn!("[{}] No valid items were parsed from the result", self.name);
        }
        items
    }

    /// Run the extraction
    pub async fn extract(&self, text: &str, options: &ExtractOptions) -> Result<Extraction> {
        let (prompt, is_incremental) = self.build_prompt(text, options);
        info!(
            "[{}] Starting extraction: text_length={}, incremental={}",
            self.name,
            text.len(),
            is_incremental
        );

        let generation = GenerationOptions::new(self.temperature, self.max_tokens).with_model(self.model.clone());
        let raw = llm::complete_text(self.provider.as_ref(), &[Message::user(prompt)], &generation)
            .await
            .map_err(|e| EngineError::Extraction(secrets::scrub(&e.to_string())))
            .with_context(|| format!("{} extraction failed", self.name))?;

        debug!("[{}] Received raw result of {} chars", self.name, raw.len());

        if !self.parse_score {
            info!("[{}] Extraction complete: result_length={}", self.name, raw.len());
            return Ok(Extraction::Text(raw));
        }

        let items = self.parse_items(&raw);
        let average = if items.is_empty() {
            0.0
        } else {
            items.iter().map(|i| i.score as f64).sum::<f64>() / items.len() as f64
        };
        info!(
            "[{}] Extraction complete: item_count={}, average_score={:.2}",
            self.name,
            items.len(),
            average
        );

        if self.return_parsed_items {
            Ok(Extraction::Items(items))
        } else {
            Ok(Extraction::Text(
                items.iter().map(ScoredItem::render).collect::<Vec<_>>().join(&self.separator),
            ))
        }
    }
}

/// Parse `some idea |4|` into text and score; a missing score is 0.
///
/// Whitespace runs collapse to single spaces and trailing punctuation is
/// ignored when looking for the score.
pub fn parse_item_with_score(item: &str) -> ScoredItem {
    let clean_item = item.split_whitespace().collect::<Vec<_>>().join(" ");
    let for_parsing = clean_item.trim_end_matches(TRAILING_PUNCTUATION).trim();

    if let Some(caps) = score_pattern().captures(for_parsing) {
        if let Ok(score) = caps[2].parse::<u32>() {
            return ScoredItem::new(caps[1].trim(), score);
        }
    }

    ScoredItem::new(clean_item, 0)
}
