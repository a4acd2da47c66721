//! Translate caller requests into GLM Chat Completions requests.
//!
//! Messages are not inspected: whatever the caller sent is forwarded and the
//! upstream decides whether it is valid.

use serde_json::Value;

use super::glm_types::GlmChatRequest;
use super::openai_types::InboundChatRequest;

/// Build the upstream request for a caller request.
/// Pure function: optional parameters are forwarded only if the caller sent them.
pub fn to_upstream(req: InboundChatRequest, default_model: &str) -> GlmChatRequest {
    GlmChatRequest {
        model: req
            .model
            .unwrap_or_else(|| Value::String(default_model.to_string())),
        messages: req.messages,
        stream: req.stream,
        temperature: req.temperature,
        max_tokens: req.max_tokens,
        top_p: req.top_p,
        functions: req.functions,
        function_call: req.function_call,
    }
}
