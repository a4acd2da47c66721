//! Caller-facing types: the OpenAI-compatible Chat Completions shapes that
//! clients send to the proxy and receive back from it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ProxyError;

// ---------------------------------------------------------------------------
// Request types (what the caller sends US)
// ---------------------------------------------------------------------------

/// A caller request. Nothing here is validated: `messages` and every
/// parameter are carried as raw JSON and the upstream decides what is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundChatRequest {
    /// `null` counts as absent and falls back to the default model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Value>,
    #[serde(default = "empty_messages")]
    pub messages: Value,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub top_p: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub functions: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,
    #[serde(default = "stream_off")]
    pub stream: Value,
}

impl InboundChatRequest {
    /// Read a request out of an already-parsed body. Only a body that is not
    /// a JSON object is refused.
    pub fn from_json(body: Value) -> Result<Self, ProxyError> {
        if !body.is_object() {
            return Err(ProxyError::translation(format!(
                "request body must be a JSON object, got {}",
                json_kind(&body)
            )));
        }
        Ok(serde_json::from_value(body)?)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn empty_messages() -> Value {
    Value::Array(Vec::new())
}

fn stream_off() -> Value {
    Value::Bool(false)
}

/// Distinguishes a key that is absent (`None`) from one that is present with
/// a `null` value (`Some(Value::Null)`). Used with `#[serde(default)]`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Response types (what we send BACK to the caller)
// ---------------------------------------------------------------------------

/// Upstream values are relayed as JSON without re-typing them; only fields
/// the upstream left out (or sent as `null`) are filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: Value,
    pub object: String,
    pub created: Value,
    pub model: Value,
    pub choices: Vec<Choice>,
    pub usage: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub index: Value,
    pub finish_reason: Value,
    pub message: Value,
}

// ---------------------------------------------------------------------------
// Model listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCard {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    JsonDecodeError,
    GlmApiError,
    ProxyError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error_type: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                message: message.into(),
                error_type,
                code: None,
            },
        }
    }

    pub fn json_decode(err: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorKind::JsonDecodeError,
            format!("Invalid JSON in request: {err}"),
        )
    }

    /// Upstream answered with a non-200 status; its raw body is embedded.
    pub fn glm_api(status: u16, body: &str) -> Self {
        let mut resp = Self::new(ErrorKind::GlmApiError, format!("GLM API Error: {body}"));
        resp.error.code = Some(status);
        resp
    }

    pub fn proxy(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::ProxyError, format!("Proxy server error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_and_null_are_distinguished() {
        let req: InboundChatRequest = serde_json::from_value(json!({
            "messages": [],
            "temperature": null,
            "top_p": 0.9
        }))
        .unwrap();

        assert_eq!(req.temperature, Some(Value::Null));
        assert_eq!(req.top_p, Some(json!(0.9)));
        assert!(req.max_tokens.is_none());
        assert!(req.model.is_none());
        assert_eq!(req.stream, json!(false));
    }

    #[test]
    fn test_loose_shapes_are_accepted() {
        let cases = [
            json!({"messages": [{"content": "hi"}]}),
            json!({"messages": "not a list"}),
            json!({"messages": null, "stream": null}),
            json!({"model": 42, "messages": [{"role": 7}], "stream": "yes"}),
            json!({}),
        ];

        for raw in cases {
            let req = InboundChatRequest::from_json(raw.clone())
                .unwrap_or_else(|e| panic!("rejected {raw}: {e}"));
            let expected_messages = raw.get("messages").cloned().unwrap_or(json!([]));
            assert_eq!(req.messages, expected_messages, "input: {raw}");
        }
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        for raw in [json!([1, 2]), json!("hello"), json!(null)] {
            let err = InboundChatRequest::from_json(raw).unwrap_err();
            assert!(matches!(err, ProxyError::Translation { .. }));
        }
    }

    #[test]
    fn test_error_body_shape() {
        let err = serde_json::to_value(ErrorResponse::glm_api(429, "slow down")).unwrap();
        assert_eq!(err["error"]["type"], "glm_api_error");
        assert_eq!(err["error"]["code"], 429);
        assert_eq!(err["error"]["message"], "GLM API Error: slow down");

        let err = serde_json::to_value(ErrorResponse::json_decode("eof")).unwrap();
        assert_eq!(err["error"]["type"], "json_decode_error");
        assert!(err["error"].get("code").is_none());

        let err = serde_json::to_value(ErrorResponse::proxy("connection refused")).unwrap();
        assert_eq!(err["error"]["type"], "proxy_error");
    }
}
