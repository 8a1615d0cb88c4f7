//! Token accounting reported by vendors

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Token usage for one vendor exchange
///
/// Vendors disagree on field names (`prompt_tokens` vs `promptTokenCount`
/// vs `input_tokens`), so extraction is lenient and every field is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<u64>,
    /// Tokens in the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    /// Total tokens billed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    /// Extract usage from a vendor payload, trying each vendor's field names
    pub fn from_vendor(value: &Value) -> Option<Self> {
        let read = |keys: &[&str]| -> Option<u64> {
            keys.iter().find_map(|k| value.get(k).and_then(Value::as_u64))
        };

        let usage = Self {
            input_tokens: read(&["prompt_tokens", "input_tokens", "promptTokenCount"]),
            output_tokens: read(&[
                "completion_tokens",
                "output_tokens",
                "candidatesTokenCount",
            ]),
            total_tokens: read(&["total_tokens", "totalTokenCount"]),
        };

        if usage == Self::default() {
            None
        } else {
            Some(usage)
        }
    }
}
