//! Summarize Tool
//!
//! One atomic summarization call, in whole-document or chunk mode.

use std::sync::Arc;

use agent_core::{
    CompletionGateway, GenerationOptions, Message, Result, TypedTool, complete_as,
};
use async_trait::async_trait;

use super::{CHUNK_PROMPT, DOCUMENT_PROMPT};
use crate::model::{MAX_CHUNK_TAKEAWAYS, MAX_TAKEAWAYS, Summary, SummarizeRequest};

/// Tool for summarizing one piece of text
pub struct SummarizeTool {
    gateway: Arc<dyn CompletionGateway>,
    options: GenerationOptions,
}

impl SummarizeTool {
    pub fn new(gateway: Arc<dyn CompletionGateway>, options: GenerationOptions) -> Self {
        Self { gateway, options }
    }
}

#[async_trait]
impl TypedTool for SummarizeTool {
    type Input = SummarizeRequest;
    type Output = Summary;

    const NAME: &'static str = "summarize";
    const DESCRIPTION: &'static str = "Summarize a piece of text and extract its key takeaways. \
        Set is_chunk when the text is one part of a larger document.";

    async fn run(&self, input: SummarizeRequest) -> Result<Summary> {
        // Nothing to send for blank input
        if input.text.trim().is_empty() {
            return Ok(Summary::default());
        }

        let (prompt, bound) = if input.is_chunk {
            (CHUNK_PROMPT, MAX_CHUNK_TAKEAWAYS)
        } else {
            (DOCUMENT_PROMPT, MAX_TAKEAWAYS)
        };

        let options = self.options.with_system_prompt(prompt);
        let summary: Summary =
            complete_as(self.gateway.as_ref(), &[Message::user(input.text)], &options).await?;

        Ok(summary.bounded(bound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::mock::ScriptedGateway;

    #[tokio::test]
    async fn test_chunk_mode_uses_chunk_instruction_and_bound() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push_text(
            r#"{"summary": "Part one.", "key_takeaways": ["a", "b", "c", "d", "e", "f", "g"]}"#,
        );

        let tool = SummarizeTool::new(gateway.clone(), GenerationOptions::default());
        let summary = tool
            .run(SummarizeRequest {
                text: "chunk text".into(),
                is_chunk: true,
            })
            .await
            .unwrap();

        assert_eq!(summary.key_takeaways.len(), MAX_CHUNK_TAKEAWAYS);
        let sent = &gateway.requests()[0];
        assert_eq!(sent.options.system_prompt.as_deref(), Some(CHUNK_PROMPT));
        assert!(sent.messages[0].text().starts_with("chunk text"));
    }

    #[tokio::test]
    async fn test_blank_text_skips_the_model() {
        let gateway = Arc::new(ScriptedGateway::new());
        let tool = SummarizeTool::new(gateway.clone(), GenerationOptions::default());

        let summary = tool
            .run(SummarizeRequest {
                text: "   ".into(),
                is_chunk: false,
            })
            .await
            .unwrap();

        assert_eq!(summary, Summary::default());
        assert_eq!(gateway.request_count(), 0);
    }
}
