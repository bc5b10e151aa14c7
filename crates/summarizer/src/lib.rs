//! # summarizer
//!
//! Document summarization that works for any input length.
//!
//! ```text
//!   text ≤ chunk_size ──▶ summarize (whole document) ──▶ output
//!
//!   text > chunk_size ──▶ chunk ─┬─▶ summarize (chunk 1) ─┐
//!                                ├─▶ summarize (chunk 2) ─┼─▶ merge ──▶ output
//!                                └─▶ summarize (chunk n) ─┘
//! ```
//!
//! Chunk summaries run concurrently; the merge waits for all of them.

pub mod chunk;
pub mod model;
pub mod pipeline;
pub mod svckit;

pub use chunk::{ChunkingConfig, DocumentChunk, chunk_text};
pub use model::{SummarizeOutput, Summary, SummaryStatus};
pub use pipeline::SummarizePipeline;

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{MergeSummariesTool, SummarizeTool};
}
