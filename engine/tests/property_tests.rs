use proptest::prelude::*;

use eva_engine::agent::{ConversationMemory, IncomingMessage};
use eva_engine::config::Config;
use eva_engine::services::chunk_text;

mod common;

use common::{controller, turn_config, ScriptedProvider};
use std::sync::Arc;

// Configuration round-trip through TOML
proptest! {
    #[test]
    fn test_config_parsing_round_trip(
        log_level in "error|warn|info|debug|trace",
        default_provider in "ollama|openai|anthropic",
        temperature in 0.0..=1.0f32,
        threshold in 1..=200usize,
        max_tool_iterations in 1..=20usize,
        web_search in any::<bool>(),
        drop_empty in any::<bool>(),
    ) {
        let mut config = Config::default();
        config.core.log_level = log_level;
        config.llm.default_provider = default_provider;
        config.agent.temperature = temperature;
        config.agent.summarization_threshold = threshold;
        config.agent.max_tool_iterations = max_tool_iterations;
        config.tools.web_search = web_search;
        if drop_empty {
            config.agent.empty_summary_policy = eva_engine::config::EmptySummaryPolicy::Drop;
        }

        let toml_string = config.to_toml_string().expect("Failed to serialize Config to string");
        let parsed = Config::from_toml_str(&toml_string).expect("Failed to parse serialized Config");

        prop_assert_eq!(config, parsed);
    }
}

// Chunking never loses text and never exceeds its bounds
proptest! {
    #[test]
    fn test_chunks_cover_text(
        text in "[a-zé ]{0,400}",
        chunk_size in 2..=80usize,
        overlap_ratio in 0.0..0.9f64,
    ) {
        let overlap = (chunk_size as f64 * overlap_ratio) as usize;
        let chunks = chunk_text(&text, chunk_size, overlap);
        let total = text.chars().count();

        if total == 0 {
            prop_assert!(chunks.is_empty());
        } else {
            prop_assert!(!chunks.is_empty());
            // first chunk starts the text, last chunk ends it
            let first: String = text.chars().take(chunks[0].chars().count()).collect();
            prop_assert_eq!(&chunks[0], &first);
            prop_assert!(text.ends_with(chunks[chunks.len() - 1].as_str()));

            // only the last chunk may grow past the size, by less than a chunk
            for chunk in &chunks[..chunks.len() - 1] {
                prop_assert_eq!(chunk.chars().count(), chunk_size);
            }
            prop_assert!(chunks[chunks.len() - 1].chars().count() < chunk_size * 2);
        }
    }
}

// After any turn the log stays within the summarization threshold
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn test_threshold_invariant(
        threshold in 1..=8usize,
        messages in prop::collection::vec("[a-z ]{1,20}", 1..15),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let provider = Arc::new(ScriptedProvider::new());
            let controller = controller(provider, turn_config(threshold));
            let mut memory = ConversationMemory::new("prop");

            for text in messages {
                controller
                    .advance_turn(&mut memory, IncomingMessage::new(text), &[])
                    .await
                    .unwrap();
                assert!(
                    memory.len() <= threshold,
                    "{} messages in memory with threshold {}",
                    memory.len(),
                    threshold
                );
            }
        });
    }
}
