//! Prompt request body model and the text-part walker.
//!
//! The body is a JSON document with a `messages` array; each message has a
//! `content.parts` array whose entries are either plain strings or opaque
//! values. The walker rewrites string parts through a caller-supplied
//! processor and leaves everything else — unknown fields at every level,
//! non-string parts — untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// A chat prompt request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBody {
    /// Conversation messages.
    pub messages: Vec<PromptMessage>,
    /// All other top-level fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One message inside the prompt body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Message content container.
    pub content: MessageContent,
    /// All other message fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content of a message: an array of textual or opaque parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageContent {
    /// Message parts. String parts are transformation targets; anything
    /// else passes through bit-for-bit.
    pub parts: Vec<Value>,
    /// All other content fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parse `body` as a prompt body, or `None` if it is not one.
///
/// A missing or non-array `messages` field (or any other shape mismatch)
/// is a recoverable condition, not an error: callers fall back to the
/// original string so the network call can always proceed.
pub fn parse_body(body: &str) -> Option<PromptBody> {
    match serde_json::from_str(body) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(error = %err, "request body is not a prompt payload; passing through");
            None
        }
    }
}

/// Run `processor` over every string part of every message in `body`.
///
/// Returns the re-serialized body on success. When the body does not parse
/// as the expected structure the input string is returned unchanged — the
/// boundary must always produce *some* body to resume the call with.
pub fn transform_text_parts(body: &str, mut processor: impl FnMut(&str) -> String) -> String {
    let Some(mut parsed) = parse_body(body) else {
        return body.to_owned();
    };

    for message in &mut parsed.messages {
        for part in &mut message.content.parts {
            if let Value::String(text) = part {
                let replaced = processor(text);
                *text = replaced;
            }
        }
    }

    serde_json::to_string(&parsed).unwrap_or_else(|err| {
        warn!(error = %err, "failed to re-serialize transformed body; passing through");
        body.to_owned()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_value(s: &str) -> Value {
        serde_json::from_str(s).expect("output should be valid JSON")
    }

    #[test]
    fn test_string_parts_transformed() {
        let body = r#"{"messages":[{"content":{"parts":["hello","world"]}}]}"#;
        let out = transform_text_parts(body, |text| text.to_uppercase());
        assert_eq!(
            as_value(&out),
            json!({"messages":[{"content":{"parts":["HELLO","WORLD"]}}]})
        );
    }

    #[test]
    fn test_non_string_parts_untouched() {
        let body = r#"{"messages":[{"content":{"parts":[{"type":"image","data":"abc"},"text part"]}}]}"#;
        let out = transform_text_parts(body, |_| "X".to_owned());
        assert_eq!(
            as_value(&out),
            json!({"messages":[{"content":{"parts":[{"type":"image","data":"abc"},"X"]}}]})
        );
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let body = r#"{"messages":[{"id":"m1","content":{"parts":["hi"],"content_type":"text"},"role":"user"}],"model":"gpt","stream":true}"#;
        let out = transform_text_parts(body, |text| text.to_owned());
        assert_eq!(
            as_value(&out),
            json!({
                "messages": [{
                    "id": "m1",
                    "role": "user",
                    "content": {"parts": ["hi"], "content_type": "text"}
                }],
                "model": "gpt",
                "stream": true
            })
        );
    }

    #[test]
    fn test_identity_round_trip() {
        let body = r#"{"messages":[{"content":{"parts":[{"k":1},null,42]}}],"extra":[1,2]}"#;
        let out = transform_text_parts(body, |text| text.to_owned());
        assert_eq!(as_value(&out), as_value(body));
    }

    #[test]
    fn test_multiple_messages_walked_in_order() {
        let body = r#"{"messages":[{"content":{"parts":["a"]}},{"content":{"parts":["b","c"]}}]}"#;
        let mut seen = Vec::new();
        transform_text_parts(body, |text| {
            seen.push(text.to_owned());
            text.to_owned()
        });
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    // ── Malformed bodies pass through ──

    #[test]
    fn test_not_json_passes_through() {
        let out = transform_text_parts("not json", |_| "X".to_owned());
        assert_eq!(out, "not json");
    }

    #[test]
    fn test_missing_messages_passes_through() {
        let body = r#"{"someOtherField":"value"}"#;
        let out = transform_text_parts(body, |_| "X".to_owned());
        assert_eq!(out, body);
    }

    #[test]
    fn test_non_array_messages_passes_through() {
        let body = r#"{"messages":"nope"}"#;
        let out = transform_text_parts(body, |_| "X".to_owned());
        assert_eq!(out, body);
    }

    #[test]
    fn test_processor_not_called_on_malformed_body() {
        let mut calls = 0_u32;
        transform_text_parts("{", |text| {
            calls = calls.saturating_add(1);
            text.to_owned()
        });
        assert_eq!(calls, 0);
    }
}
