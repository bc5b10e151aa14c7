//! Service Kit - Summarization Tools
//!
//! Single-unit capabilities the pipeline is built from. Both take their
//! gateway at construction and pass their instruction per call.

mod merge;
mod summarize;

pub use merge::MergeSummariesTool;
pub use summarize::SummarizeTool;

/// Instruction for one chunk of a larger document
pub const CHUNK_PROMPT: &str = "You are a precise summarization assistant.
You will receive ONE CHUNK from a larger document.
Your job is to:
1. Write a concise summary of this chunk only.
2. Extract up to 5 key takeaways from this chunk.
Keep your response focused on what is in this chunk alone.";

/// Instruction for a complete document
pub const DOCUMENT_PROMPT: &str = "You are a precise summarization assistant.
You will receive a complete piece of text.
Your job is to:
1. Write a concise, coherent summary.
2. Extract up to 7 key takeaways: the most important insights a reader should remember.
Be objective and thorough.";

/// Instruction for merging chunk summaries
pub const MERGE_PROMPT: &str = "You are a precise summarization assistant.
You will receive several chunk summaries that together cover a large document.
Your job is to:
1. Write a single, unified, coherent summary of the entire document.
2. Extract up to 7 key takeaways: the most important insights from the whole document.
Do not mention that the text was split into chunks.";
