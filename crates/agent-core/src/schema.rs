//! Schema helpers
//!
//! Capability inputs/outputs and structured completions are described with
//! `schemars` and checked with `jsonschema`.

use schemars::JsonSchema;
use serde_json::Value;

/// Generate the JSON Schema advertised to the model for `T`.
///
/// The `$schema` and `title` keys are dropped; providers reject or ignore
/// them in tool definitions.
pub fn json_schema_for<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}));

    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }

    value
}

/// Check `instance` against `schema`, collecting every violation into one
/// message. An uncompilable schema is reported as a violation too.
pub fn check_instance(schema: &Value, instance: &Value) -> Result<(), String> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| format!("invalid schema: {e}"))?;

    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct LookupArgs {
        /// The user to look up.
        user_id: String,
        #[serde(default)]
        limit: Option<u32>,
    }

    #[test]
    fn test_schema_shape() {
        let schema = json_schema_for::<LookupArgs>();
        assert_eq!(schema["type"], "object");
        assert!(schema.get("title").is_none());
        assert!(schema["required"]
            .as_array()
            .unwrap()
            .contains(&json!("user_id")));
    }

    #[test]
    fn test_check_instance_reports_violations() {
        let schema = json_schema_for::<LookupArgs>();
        assert!(check_instance(&schema, &json!({"user_id": "ana"})).is_ok());

        let err = check_instance(&schema, &json!({"limit": "ten"})).unwrap_err();
        assert!(err.contains("user_id"));
    }
}
