//! Summarization data types

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Takeaway bound for whole-document and merged summaries
pub const MAX_TAKEAWAYS: usize = 7;

/// Takeaway bound for a single chunk
pub const MAX_CHUNK_TAKEAWAYS: usize = 5;

/// Input of one summarization unit
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SummarizeRequest {
    /// The text to summarize.
    pub text: String,

    /// True when this text is one chunk of a larger document.
    #[serde(default)]
    pub is_chunk: bool,
}

/// Input of the merge step
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct MergeRequest {
    /// Labeled chunk summaries covering one document, in order.
    pub text: String,
}

/// Summary and key takeaways of one unit of text
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct Summary {
    /// Concise summary of the input text.
    pub summary: String,

    /// Bullet-point key takeaways extracted from the text.
    pub key_takeaways: Vec<String>,
}

impl Summary {
    /// Drop empty takeaways and keep at most `max`
    #[must_use]
    pub fn bounded(mut self, max: usize) -> Self {
        self.key_takeaways.retain(|t| !t.trim().is_empty());
        self.key_takeaways.truncate(max);
        self
    }
}

/// Pipeline status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Success,
    Failed,
}

/// Pipeline input
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SummarizeDocument {
    /// The full document to summarize.
    pub text: String,
}

/// Pipeline result; produced for failures too
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SummarizeOutput {
    pub summary: String,
    pub key_takeaways: Vec<String>,
    pub status: SummaryStatus,
    /// Character count of the raw input
    pub original_content_size: usize,
    /// Chunks summarized before merging (1 for direct summarization)
    pub chunks: usize,
}

impl SummarizeOutput {
    pub(crate) fn success(summary: Summary, original_content_size: usize, chunks: usize) -> Self {
        Self {
            summary: summary.summary,
            key_takeaways: summary.key_takeaways,
            status: SummaryStatus::Success,
            original_content_size,
            chunks,
        }
    }

    pub(crate) fn failed(reason: &str, original_content_size: usize) -> Self {
        Self {
            summary: format!("Summarization failed: {reason}"),
            key_takeaways: Vec::new(),
            status: SummaryStatus::Failed,
            original_content_size,
            chunks: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SummaryStatus::Success
    }
}
