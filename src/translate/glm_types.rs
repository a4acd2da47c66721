//! Upstream-facing types for the GLM Chat Completions API.
//!
//! The upstream speaks the same dialect as the caller, so message lists and
//! response fields stay raw JSON. Every response field is optional because
//! the upstream is not guaranteed to send it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Request types (what we send TO the upstream)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlmChatRequest {
    pub model: Value,
    pub messages: Value,
    pub stream: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,
}

impl GlmChatRequest {
    /// Only a literal `true` asks for an event stream.
    pub fn is_streaming(&self) -> bool {
        self.stream == Value::Bool(true)
    }
}

// ---------------------------------------------------------------------------
// Response types (what we receive FROM the upstream)
// ---------------------------------------------------------------------------

/// `null` deserializes to `None`, so it is treated like a missing key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlmChatResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub created: Option<Value>,
    #[serde(default)]
    pub model: Option<Value>,
    #[serde(default)]
    pub choices: Option<Vec<GlmChoice>>,
    #[serde(default)]
    pub usage: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GlmChoice {
    #[serde(default)]
    pub index: Option<Value>,
    #[serde(default)]
    pub finish_reason: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}
