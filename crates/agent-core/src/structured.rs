//! Structured completion helpers
//!
//! Backends without a native JSON mode get the schema as an appended
//! instruction; replies are unwrapped from code fences and checked against
//! the schema before they reach the caller.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AgentError, Result};
use crate::message::{ContentBlock, Message, MessageContent, Role};
use crate::provider::{CompletionGateway, GenerationOptions};
use crate::schema::{check_instance, json_schema_for};

/// Instruction appended to the final driver turn
pub fn structured_instruction(schema: &Value) -> String {
    let pretty = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "\n\nRespond ONLY with valid JSON that matches this schema:\n{pretty}\n\
         Do not include any explanation or markdown code fences."
    )
}

/// Copy of `messages` whose last driver turn carries the JSON instruction.
/// A new driver turn is added when the history does not end with one.
pub fn with_structured_instruction(messages: &[Message], schema: &Value) -> Vec<Message> {
    let instruction = structured_instruction(schema);
    let mut augmented = messages.to_vec();

    match augmented.last_mut() {
        Some(last) if last.role == Role::User => match &mut last.content {
            MessageContent::Text(text) => text.push_str(&instruction),
            MessageContent::Blocks(blocks) => {
                blocks.push(ContentBlock::text(instruction.trim_start()));
            }
        },
        _ => augmented.push(Message::user(instruction.trim_start())),
    }

    augmented
}

/// Strip a surrounding markdown code fence, if any
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.split_once('\n') {
        // Drop the opening fence line (it may carry a language tag)
        Some((_, body)) => body,
        // One-line fence: only a tag glued to the opening fence goes
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.rfind("```").map_or(body, |end| &body[..end]).trim()
}

/// Parse a raw reply as JSON conforming to `schema`
pub fn parse_structured(raw: &str, schema: &Value) -> Result<Value> {
    let candidate = strip_code_fences(raw);

    let value: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        // Prose around the object: fall back to the outermost braces
        Err(e) => extract_object(candidate)
            .or_else(|| extract_object(raw))
            .and_then(|inner| serde_json::from_str(inner).ok())
            .ok_or_else(|| AgentError::SchemaViolation(format!("reply is not JSON: {e}")))?,
    };

    check_instance(schema, &value).map_err(AgentError::SchemaViolation)?;
    Ok(value)
}

fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Structured completion decoded into `T`, with the schema derived from `T`
pub async fn complete_as<T>(
    gateway: &dyn CompletionGateway,
    messages: &[Message],
    options: &GenerationOptions,
) -> Result<T>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = json_schema_for::<T>();
    let value = gateway
        .complete_structured(messages, &schema, options)
        .await?;
    serde_json::from_value(value).map_err(|e| AgentError::SchemaViolation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedGateway;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct Verdict {
        summary: String,
        key_takeaways: Vec<String>,
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json {\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```[1, 2]```"), "[1, 2]");
    }

    #[test]
    fn test_instruction_appended_to_last_user_turn() {
        let schema = json!({"type": "object"});
        let messages = vec![Message::user("Summarize this.")];
        let augmented = with_structured_instruction(&messages, &schema);

        assert_eq!(augmented.len(), 1);
        let text = augmented[0].text();
        assert!(text.starts_with("Summarize this.\n\nRespond ONLY with valid JSON"));
        assert!(text.contains("\"type\": \"object\""));
        assert_eq!(messages[0].text(), "Summarize this.");
    }

    #[test]
    fn test_parse_structured_rejects_nonconforming() {
        let schema = json_schema_for::<Verdict>();

        let ok = parse_structured("```json\n{\"summary\": \"s\", \"key_takeaways\": []}\n```", &schema);
        assert!(ok.is_ok());

        let missing = parse_structured("{\"summary\": \"s\"}", &schema).unwrap_err();
        assert!(matches!(missing, AgentError::SchemaViolation(_)));

        let garbage = parse_structured("I cannot help with that.", &schema).unwrap_err();
        assert!(matches!(garbage, AgentError::SchemaViolation(_)));
    }

    #[test]
    fn test_parse_structured_tolerates_surrounding_prose() {
        let schema = json_schema_for::<Verdict>();
        let value = parse_structured(
            "Here you go: {\"summary\": \"s\", \"key_takeaways\": [\"k\"]} Enjoy.",
            &schema,
        )
        .unwrap();
        assert_eq!(value["key_takeaways"][0], "k");
    }

    #[test]
    fn test_parse_structured_accepts_one_line_fences() {
        let schema = json_schema_for::<Verdict>();

        let inline = parse_structured(
            "```json {\"summary\": \"s\", \"key_takeaways\": []}```",
            &schema,
        )
        .unwrap();
        assert_eq!(inline["summary"], "s");

        // Object on the opening fence line, closing fence below it
        let opening = parse_structured(
            "```{\"summary\": \"t\", \"key_takeaways\": [\"k\"]}\n```",
            &schema,
        )
        .unwrap();
        assert_eq!(opening["summary"], "t");
    }

    #[tokio::test]
    async fn test_complete_as_decodes_fenced_reply() {
        let gateway = ScriptedGateway::new();
        gateway.push_text("```json\n{\"summary\": \"Short.\", \"key_takeaways\": [\"one\"]}\n```");

        let verdict: Verdict = complete_as(
            &gateway,
            &[Message::user("text")],
            &GenerationOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(verdict.summary, "Short.");
        assert_eq!(verdict.key_takeaways, vec!["one"]);

        let sent = &gateway.requests()[0];
        assert!(sent.messages[0].text().contains("Respond ONLY with valid JSON"));
    }
}
