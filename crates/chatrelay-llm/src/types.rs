//! Wire types for the OpenAI-compatible chat completion API.
//!
//! Outbound: [`WireRequest`] / [`WireMessage`]. Inbound: the blocking
//! [`WireResponse`] envelope and the per-event [`StreamDelta`] record.
//! Inbound types are lenient: every field defaults, `null` containers read
//! as empty, and unknown fields are ignored, so heartbeat or
//! vendor-specific events deserialize cleanly.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use chatrelay_types::Role;

/// A message sent verbatim to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl WireMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// A provider-specific reasoning-control parameter.
///
/// Serialized as a single top-level key of the request body, e.g.
/// `"enable_thinking": true` or `"reasoning_effort": "high"`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningParam {
    pub name: &'static str,
    pub value: serde_json::Value,
}

impl Serialize for ReasoningParam {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.name, &self.value)?;
        map.end()
    }
}

/// The request body POSTed to `{base_url}/chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
    /// Zero or one reasoning parameter, flattened into the body.
    #[serde(flatten)]
    pub reasoning: Option<ReasoningParam>,
}

// ── Blocking response ───────────────────────────────────────────────────

/// The blocking response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireResponse {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<WireChoice>,
}

/// A single choice within a blocking response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: ResponseMessage,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The assistant message of a blocking response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,

    /// Structured reasoning text, when the provider returns it separately.
    #[serde(default)]
    pub reasoning_content: Option<String>,

    /// Vendor spellings of the same field. Some upstreams send more than one.
    #[serde(default)]
    pub reasoning: Option<String>,

    #[serde(default)]
    pub thinking: Option<String>,
}

impl ResponseMessage {
    /// The first non-empty of `reasoning_content`, `reasoning`, `thinking`.
    pub fn reasoning_text(&self) -> Option<&str> {
        [&self.reasoning_content, &self.reasoning, &self.thinking]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|text| !text.is_empty())
    }
}

// ── Streaming ───────────────────────────────────────────────────────────

/// One `data:` payload of a streaming response (`chat.completion.chunk`).
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StreamDelta {
    #[serde(default, deserialize_with = "null_as_default")]
    pub choices: Vec<StreamDeltaChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StreamDeltaChoice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub delta: StreamDeltaContent,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StreamDeltaContent {
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub reasoning_content: Option<String>,

    #[serde(default)]
    pub reasoning: Option<String>,
}

impl StreamDeltaContent {
    /// Reasoning fragment: `reasoning_content`, else `reasoning`. Empty
    /// strings count as absent.
    pub fn take_reasoning(&mut self) -> Option<String> {
        let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());
        non_empty(self.reasoning_content.take()).or_else(|| non_empty(self.reasoning.take()))
    }
}

/// Reads an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_without_reasoning_param() {
        let req = WireRequest {
            model: "gpt-4o".into(),
            messages: vec![WireMessage::system("s"), WireMessage::user("u")],
            stream: false,
            reasoning: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-4o",
                "messages": [
                    {"role": "system", "content": "s"},
                    {"role": "user", "content": "u"}
                ],
                "stream": false
            })
        );
    }

    #[test]
    fn reasoning_param_flattened_to_top_level() {
        let req = WireRequest {
            model: "qwen-plus".into(),
            messages: vec![WireMessage::user("u")],
            stream: true,
            reasoning: Some(ReasoningParam {
                name: "enable_thinking",
                value: json!(true),
            }),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["enable_thinking"], json!(true));
        assert_eq!(value["stream"], json!(true));
        assert!(value.get("reasoning").is_none());
    }

    #[test]
    fn response_reads_reasoning_spellings() {
        for key in ["reasoning_content", "reasoning", "thinking"] {
            let body = json!({
                "choices": [{"message": {"role": "assistant", "content": "a", (key): "r"}}]
            });
            let resp: WireResponse = serde_json::from_value(body).unwrap();
            assert_eq!(resp.choices[0].message.reasoning_text(), Some("r"));
        }
    }

    #[test]
    fn response_with_several_reasoning_keys() {
        let resp: WireResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"a","reasoning_content":"rc","reasoning":"r","thinking":"t"}}]}"#,
        )
        .unwrap();
        let message = &resp.choices[0].message;
        assert_eq!(message.content.as_deref(), Some("a"));
        assert_eq!(message.reasoning_text(), Some("rc"));

        let resp: WireResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"a","reasoning_content":"","thinking":"t"}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.choices[0].message.reasoning_text(), Some("t"));
    }

    #[test]
    fn null_containers_read_as_empty() {
        let resp: WireResponse = serde_json::from_str(r#"{"choices":null}"#).unwrap();
        assert!(resp.choices.is_empty());
        let resp: WireResponse = serde_json::from_str(r#"{"choices":[{"message":null}]}"#).unwrap();
        assert!(resp.choices[0].message.content.is_none());

        let d: StreamDelta = serde_json::from_str(r#"{"choices":null,"usage":{}}"#).unwrap();
        assert!(d.choices.is_empty());
        let d: StreamDelta =
            serde_json::from_str(r#"{"choices":[{"delta":null,"finish_reason":"stop"}]}"#).unwrap();
        assert!(d.choices[0].delta.content.is_none());
    }

    #[test]
    fn delta_with_both_reasoning_keys() {
        let mut d: StreamDelta = serde_json::from_str(
            r#"{"choices":[{"delta":{"reasoning_content":"r","reasoning":"r","content":"c"}}]}"#,
        )
        .unwrap();
        let delta = &mut d.choices[0].delta;
        assert_eq!(delta.take_reasoning().as_deref(), Some("r"));
        assert_eq!(delta.content.as_deref(), Some("c"));
    }

    #[test]
    fn response_null_content() {
        let resp: WireResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(resp.choices[0].message.content.is_none());
    }

    #[test]
    fn delta_tolerates_missing_fields() {
        let d: StreamDelta = serde_json::from_str(r#"{"id":"x","object":"chunk"}"#).unwrap();
        assert!(d.choices.is_empty());
        let d: StreamDelta = serde_json::from_str(r#"{"choices":[{"index":0}]}"#).unwrap();
        assert!(d.choices[0].delta.content.is_none());
    }
}
