//! Chunked Summarization Pipeline
//!
//! Short text is summarized in one call. Longer text is split into
//! overlapping chunks, every chunk is summarized concurrently, and a single
//! merge call runs once all chunk summaries are in.

use std::sync::Arc;

use agent_core::{CompletionGateway, GenerationOptions, Result, TypedTool};
use async_trait::async_trait;
use futures::future::try_join_all;

use crate::chunk::{ChunkingConfig, chunk_text};
use crate::model::{
    MergeRequest, SummarizeDocument, SummarizeOutput, SummarizeRequest, Summary,
};
use crate::svckit::{MergeSummariesTool, SummarizeTool};

/// Summarization pipeline over one gateway
pub struct SummarizePipeline {
    summarize: SummarizeTool,
    merge: MergeSummariesTool,
    chunking: ChunkingConfig,
}

impl SummarizePipeline {
    pub fn new(
        gateway: Arc<dyn CompletionGateway>,
        options: GenerationOptions,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            summarize: SummarizeTool::new(Arc::clone(&gateway), options.clone()),
            merge: MergeSummariesTool::new(gateway, options),
            chunking,
        }
    }

    pub const fn chunking(&self) -> &ChunkingConfig {
        &self.chunking
    }

    /// Summarize `text`. Never fails: errors are reported through
    /// [`SummaryStatus::Failed`](crate::model::SummaryStatus::Failed).
    pub async fn run(&self, text: &str) -> SummarizeOutput {
        let original_size = text.chars().count();

        let result = if self.chunking.needs_chunking(text) {
            self.summarize_chunked(text).await
        } else {
            self.summarize_direct(text).await.map(|s| (s, 1))
        };

        match result {
            Ok((summary, chunks)) => {
                tracing::info!(chars = original_size, chunks, "Summarization complete");
                SummarizeOutput::success(summary, original_size, chunks)
            }
            Err(e) => {
                tracing::warn!(chars = original_size, error = %e, "Summarization failed");
                SummarizeOutput::failed(&e.to_string(), original_size)
            }
        }
    }

    async fn summarize_direct(&self, text: &str) -> Result<Summary> {
        self.summarize
            .run(SummarizeRequest {
                text: text.to_string(),
                is_chunk: false,
            })
            .await
    }

    async fn summarize_chunked(&self, text: &str) -> Result<(Summary, usize)> {
        let chunks = chunk_text(text, &self.chunking);
        tracing::debug!(count = chunks.len(), "Summarizing chunks");

        let summaries = try_join_all(chunks.iter().map(|chunk| {
            self.summarize.run(SummarizeRequest {
                text: chunk.text.clone(),
                is_chunk: true,
            })
        }))
        .await?;

        let combined = chunks
            .iter()
            .zip(&summaries)
            .map(|(chunk, summary)| chunk.label(&summary.summary))
            .collect::<Vec<_>>()
            .join("\n\n");

        let merged = self.merge.run(MergeRequest { text: combined }).await?;
        Ok((merged, chunks.len()))
    }
}

#[async_trait]
impl TypedTool for SummarizePipeline {
    type Input = SummarizeDocument;
    type Output = SummarizeOutput;

    const NAME: &'static str = "summarize_document";
    const DESCRIPTION: &'static str = "Summarize a document of any length, chunking it when it \
        exceeds the configured size. Returns a summary, key takeaways and a status.";

    async fn run(&self, input: SummarizeDocument) -> Result<SummarizeOutput> {
        Ok(Self::run(self, &input.text).await)
    }
}
