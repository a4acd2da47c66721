//! Translate GLM answers into what the caller receives.
//!
//! Streamed chunks are already in the caller's dialect and are relayed
//! untouched. Buffered answers are rebuilt field by field, relaying every
//! upstream value as-is and filling in only what the upstream left out.

use bytes::Bytes;
use serde_json::{json, Map, Value};

use super::glm_types::{GlmChatResponse, GlmChoice};
use super::openai_types::{ChatCompletionResponse, Choice};
use crate::error::{ProxyError, Result};

/// A streamed chunk for the caller. Event-stream framing is already
/// compatible and must not be re-serialized.
pub fn passthrough(chunk: Bytes) -> Bytes {
    chunk
}

/// Parse a buffered upstream body and rebuild it as a completion.
pub fn rebuild(payload: &[u8], default_model: &str) -> Result<ChatCompletionResponse> {
    let resp: GlmChatResponse = serde_json::from_slice(payload).map_err(|e| {
        ProxyError::translation(format!(
            "Failed to parse upstream response: {}. Body: {}",
            e,
            truncate(&String::from_utf8_lossy(payload), 300)
        ))
    })?;

    Ok(glm_to_openai(resp, default_model))
}

pub fn glm_to_openai(resp: GlmChatResponse, default_model: &str) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: resp.id.unwrap_or_else(|| Value::String(synthetic_id())),
        object: "chat.completion".to_string(),
        created: resp.created.unwrap_or_else(|| json!(0)),
        model: resp
            .model
            .unwrap_or_else(|| Value::String(default_model.to_string())),
        choices: resp
            .choices
            .unwrap_or_default()
            .into_iter()
            .map(translate_choice)
            .collect(),
        usage: resp.usage.unwrap_or_else(zero_usage),
    }
}

fn translate_choice(choice: GlmChoice) -> Choice {
    Choice {
        index: choice.index.unwrap_or_else(|| json!(0)),
        finish_reason: choice.finish_reason.unwrap_or_else(|| json!("stop")),
        message: choice.message.unwrap_or_else(|| Value::Object(Map::new())),
    }
}

fn zero_usage() -> Value {
    json!({"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0})
}

/// Stand-in id for responses that arrive without one.
fn synthetic_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(raw: Value) -> ChatCompletionResponse {
        rebuild(&serde_json::to_vec(&raw).unwrap(), "glm-4.6").unwrap()
    }

    #[test]
    fn test_full_response_is_preserved() {
        let resp = completion(json!({
            "id": "abc123",
            "created": 1_760_000_000,
            "model": "glm-4.6",
            "choices": [{
                "index": 0,
                "finish_reason": "length",
                "message": {"role": "assistant", "content": "Hello!", "reasoning_content": "hmm"}
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30}
        }));

        assert_eq!(resp.id, "abc123");
        assert_eq!(resp.object, "chat.completion");
        assert_eq!(resp.created, 1_760_000_000);
        assert_eq!(resp.model, "glm-4.6");
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.choices[0].index, 0);
        assert_eq!(resp.choices[0].finish_reason, "length");
        assert_eq!(
            resp.choices[0].message,
            json!({"role": "assistant", "content": "Hello!", "reasoning_content": "hmm"})
        );
        assert_eq!(
            resp.usage,
            json!({"prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30})
        );
    }

    #[test]
    fn test_missing_usage_is_zeroed() {
        for raw in [json!({"id": "x", "choices": []}), json!({"usage": null})] {
            assert_eq!(completion(raw).usage, zero_usage());
        }
    }

    #[test]
    fn test_partial_usage_is_not_filled_in() {
        let resp = completion(json!({"id": "a", "usage": {"prompt_tokens": 5}}));
        assert_eq!(resp.usage, json!({"prompt_tokens": 5}));
    }

    #[test]
    fn test_null_usage_counter_is_relayed() {
        let resp = completion(json!({
            "id": "a",
            "usage": {"prompt_tokens": 5, "completion_tokens": null}
        }));

        assert_eq!(resp.usage, json!({"prompt_tokens": 5, "completion_tokens": null}));
    }

    #[test]
    fn test_extra_usage_fields_survive() {
        let usage = json!({
            "prompt_tokens": 5,
            "completion_tokens": 1,
            "total_tokens": 6,
            "prompt_tokens_details": {"cached_tokens": 3}
        });

        assert_eq!(completion(json!({"usage": usage.clone()})).usage, usage);
    }

    #[test]
    fn test_unusual_scalar_types_are_relayed() {
        let resp = completion(json!({
            "id": 17,
            "created": 1.5,
            "model": {"name": "glm"},
            "choices": [{"index": "0", "finish_reason": 3}]
        }));

        assert_eq!(resp.id, 17);
        assert_eq!(resp.created, 1.5);
        assert_eq!(resp.model, json!({"name": "glm"}));
        assert_eq!(resp.choices[0].index, "0");
        assert_eq!(resp.choices[0].finish_reason, 3);
    }

    #[test]
    fn test_missing_id_gets_synthetic_one() {
        let a = completion(json!({"choices": []}));
        let b = completion(json!({"id": null}));

        let a_id = a.id.as_str().unwrap();
        assert!(a_id.starts_with("chatcmpl-"));
        assert!(a_id.len() > "chatcmpl-".len());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_empty_object_gets_all_defaults() {
        let resp = completion(json!({}));

        assert_eq!(resp.object, "chat.completion");
        assert_eq!(resp.created, 0);
        assert_eq!(resp.model, "glm-4.6");
        assert!(resp.choices.is_empty());
        assert_eq!(resp.usage, zero_usage());
    }

    #[test]
    fn test_choice_defaults_apply_per_field() {
        let resp = completion(json!({
            "choices": [
                {},
                {"index": 1, "message": {"role": "assistant", "content": "b"}},
                {"index": 2, "finish_reason": "tool_calls", "message": null}
            ]
        }));

        assert_eq!(resp.choices[0].index, 0);
        assert_eq!(resp.choices[0].finish_reason, "stop");
        assert_eq!(resp.choices[0].message, json!({}));

        assert_eq!(resp.choices[1].index, 1);
        assert_eq!(resp.choices[1].finish_reason, "stop");
        assert_eq!(resp.choices[1].message["content"], "b");

        assert_eq!(resp.choices[2].finish_reason, "tool_calls");
        assert_eq!(resp.choices[2].message, json!({}));
    }

    #[test]
    fn test_passthrough_is_identity() {
        let raw = Bytes::from_static(
            b"data: {\"id\":\"1\",\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n",
        );

        assert_eq!(passthrough(raw.clone()), raw);
    }

    #[test]
    fn test_non_json_payload_is_translation_error() {
        let err = rebuild(b"<html>oops</html>", "glm-4.6").unwrap_err();

        assert!(matches!(err, ProxyError::Translation { .. }));
        assert!(err.to_string().contains("oops"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("short", 300), "short");
    }
}
