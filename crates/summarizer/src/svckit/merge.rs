//! Merge Summaries Tool
//!
//! Fan-in step: turns labeled chunk summaries into one document summary.

use std::sync::Arc;

use agent_core::{
    CompletionGateway, GenerationOptions, Message, Result, TypedTool, complete_as,
};
use async_trait::async_trait;

use super::MERGE_PROMPT;
use crate::model::{MAX_TAKEAWAYS, MergeRequest, Summary};

/// Tool for merging chunk summaries
pub struct MergeSummariesTool {
    gateway: Arc<dyn CompletionGateway>,
    options: GenerationOptions,
}

impl MergeSummariesTool {
    pub fn new(gateway: Arc<dyn CompletionGateway>, options: GenerationOptions) -> Self {
        Self { gateway, options }
    }
}

#[async_trait]
impl TypedTool for MergeSummariesTool {
    type Input = MergeRequest;
    type Output = Summary;

    const NAME: &'static str = "merge_summaries";
    const DESCRIPTION: &'static str =
        "Merge several chunk summaries of one document into a single summary with key takeaways.";

    async fn run(&self, input: MergeRequest) -> Result<Summary> {
        let options = self.options.with_system_prompt(MERGE_PROMPT);
        let summary: Summary =
            complete_as(self.gateway.as_ref(), &[Message::user(input.text)], &options).await?;

        Ok(summary.bounded(MAX_TAKEAWAYS))
    }
}
