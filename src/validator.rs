//! Ready-made validators for [`crate::RouteBuilder::query`] and
//! [`crate::RouteBuilder::body`].
//!
//! A validator is any `Fn(&Value) -> anyhow::Result<T>`. The pipeline wraps
//! its failures into `BadRequest("Invalid Query")` / `BadRequest("Invalid
//! Body")` with the original error as cause.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Schema violations collected from a JSON Schema validator
#[derive(Debug, thiserror::Error)]
#[error("{} schema violation(s): {}", .errors.len(), .errors.join("; "))]
pub struct SchemaViolation {
    pub errors: Vec<String>,
}

/// Deserialise the input into `T` with serde.
///
/// ```rust
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct NewTrack { title: String }
///
/// let validate = sprig::validator::typed::<NewTrack>();
/// assert_eq!(validate(&json!({"title": "Intro"})).unwrap().title, "Intro");
/// assert!(validate(&json!({"name": "Intro"})).is_err());
/// ```
pub fn typed<T>() -> impl Fn(&Value) -> anyhow::Result<T> + Send + Sync + Clone + 'static
where
    T: DeserializeOwned + 'static,
{
    |value: &Value| -> anyhow::Result<T> { Ok(T::deserialize(value)?) }
}

/// Compile `schema` once and check every input against it. Valid input is
/// passed through unchanged.
///
/// # Errors
///
/// When `schema` is not a valid JSON Schema.
pub fn json_schema(
    schema: &Value,
) -> anyhow::Result<impl Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static> {
    let compiled = jsonschema::validator_for(schema)
        .map_err(|err| anyhow::anyhow!("invalid JSON schema: {err}"))?;

    Ok(move |value: &Value| -> anyhow::Result<Value> {
        let errors: Vec<String> = compiled.iter_errors(value).map(|e| e.to_string()).collect();
        if errors.is_empty() {
            Ok(value.clone())
        } else {
            Err(SchemaViolation { errors }.into())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Page {
        limit: String,
    }

    #[test]
    fn test_typed_validator() {
        let validate = typed::<Page>();
        assert_eq!(validate(&json!({"limit": "10"})).unwrap(), Page { limit: "10".into() });
        assert!(validate(&json!({})).is_err());
    }

    #[test]
    fn test_json_schema_validator() {
        let validate = json_schema(&json!({
            "type": "object",
            "required": ["title"],
            "properties": { "title": { "type": "string", "minLength": 1 } }
        }))
        .unwrap();

        assert_eq!(validate(&json!({"title": "Intro"})).unwrap(), json!({"title": "Intro"}));
        let err = validate(&json!({"title": ""})).unwrap_err();
        assert!(err.downcast_ref::<SchemaViolation>().is_some());
        assert!(validate(&json!({})).is_err());
    }

    #[test]
    fn test_invalid_schema_rejected() {
        assert!(json_schema(&json!({"type": 12})).is_err());
    }
}
