//! Text services built on the completion provider
//!
//! Standalone of the conversation engine: chunked document summarization and
//! prompt-driven item extraction.

pub mod chunking;
pub mod extraction;
pub mod summarization;

pub use chunking::{chunk_text, chunk_text_default};
pub use extraction::{Extraction, ExtractOptions, ExtractionService, ScoredItem};
pub use summarization::{DocumentSummary, SummarizationService};
