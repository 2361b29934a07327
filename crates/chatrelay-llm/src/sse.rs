//! SSE (Server-Sent Events) line reassembly and parsing.
//!
//! Upstream network chunks do not line up with protocol events. A chunk can
//! hold half a line, several lines, or cut a multi-byte character in two.
//! [`LineBuffer`] therefore buffers raw bytes and only decodes a line once
//! its terminator has arrived.
//!
//! ```text
//! data: {"choices":[{"delta":{"reasoning_content":"Let me think"}}]}
//!
//! data: {"choices":[{"delta":{"content":"Hello"}}]}
//!
//! data: [DONE]
//! ```

use crate::error::{RelayError, Result};
use crate::types::StreamDelta;

/// The sentinel payload that marks the end of an SSE stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Prefix of event-data lines.
const DATA_MARKER: &str = "data:";

/// Growing byte buffer that yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one network chunk.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Remove and return the next complete line, without its terminator
    /// (`\n` or `\r\n`). Returns `None` when no terminator is buffered.
    pub fn next_line(&mut self) -> Option<String> {
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Take whatever unterminated text is left, leaving the buffer empty.
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// What a single candidate line means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// Blank lines, comments, `event:`/`id:`/`retry:` fields, empty data.
    Ignored,
    /// The `[DONE]` sentinel.
    Done,
    /// A data payload, marker stripped and trimmed.
    Payload(&'a str),
}

/// Classify one line. Only non-empty `data:` lines are significant; the
/// marker may or may not be followed by a space.
pub fn classify_line(line: &str) -> SseLine<'_> {
    let Some(rest) = line.trim().strip_prefix(DATA_MARKER) else {
        return SseLine::Ignored;
    };
    match rest.trim() {
        "" => SseLine::Ignored,
        DONE_SENTINEL => SseLine::Done,
        payload => SseLine::Payload(payload),
    }
}

/// The fragments carried by one delta event. Empty strings are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaFragments {
    pub reasoning: Option<String>,
    pub content: Option<String>,
}

impl DeltaFragments {
    /// `true` for heartbeat/control deltas that carry no text.
    pub fn is_empty(&self) -> bool {
        self.reasoning.is_none() && self.content.is_none()
    }
}

/// Parse one data payload into its reasoning and content fragments.
///
/// # Errors
///
/// Returns [`RelayError::InvalidResponse`] if the payload is not a JSON
/// delta record. Records without choices or without text parse fine and
/// yield empty fragments.
pub fn parse_delta(payload: &str) -> Result<DeltaFragments> {
    let delta: StreamDelta = serde_json::from_str(payload)
        .map_err(|e| RelayError::InvalidResponse(format!("failed to parse SSE delta: {e}")))?;

    let Some(mut choice) = delta.choices.into_iter().next() else {
        return Ok(DeltaFragments::default());
    };
    Ok(DeltaFragments {
        reasoning: choice.delta.take_reasoning(),
        content: choice.delta.content.filter(|s| !s.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── LineBuffer ──────────────────────────────────────────────────

    #[test]
    fn partial_line_waits_for_terminator() {
        let mut buf = LineBuffer::new();
        buf.extend(b"data: {\"a\"");
        assert_eq!(buf.next_line(), None);
        buf.extend(b":1}\nda");
        assert_eq!(buf.next_line().as_deref(), Some("data: {\"a\":1}"));
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.take_remainder().as_deref(), Some("da"));
        assert!(buf.is_empty());
    }

    #[test]
    fn many_lines_in_one_chunk() {
        let mut buf = LineBuffer::new();
        buf.extend(b"a\n\nb\r\nc");
        assert_eq!(buf.next_line().as_deref(), Some("a"));
        assert_eq!(buf.next_line().as_deref(), Some(""));
        assert_eq!(buf.next_line().as_deref(), Some("b"));
        assert_eq!(buf.next_line(), None);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn split_multibyte_character_survives() {
        let line = "data: 思考\n".as_bytes();
        let mut buf = LineBuffer::new();
        // Cut inside the first CJK character.
        buf.extend(&line[..7]);
        assert_eq!(buf.next_line(), None);
        buf.extend(&line[7..]);
        assert_eq!(buf.next_line().as_deref(), Some("data: 思考"));
    }

    #[test]
    fn empty_remainder_is_none() {
        let mut buf = LineBuffer::new();
        buf.extend(b"x\n");
        buf.next_line();
        assert_eq!(buf.take_remainder(), None);
    }

    // ── classify_line ───────────────────────────────────────────────

    #[test]
    fn non_data_lines_ignored() {
        for line in ["", "   ", ": keep-alive", "event: message", "id: 7", "retry: 10"] {
            assert_eq!(classify_line(line), SseLine::Ignored, "line: {line:?}");
        }
    }

    #[test]
    fn empty_data_ignored() {
        assert_eq!(classify_line("data:"), SseLine::Ignored);
        assert_eq!(classify_line("data:   "), SseLine::Ignored);
    }

    #[test]
    fn done_sentinel_with_and_without_space() {
        assert_eq!(classify_line("data: [DONE]"), SseLine::Done);
        assert_eq!(classify_line("data:[DONE]"), SseLine::Done);
        assert_eq!(classify_line("  data: [DONE]  "), SseLine::Done);
    }

    #[test]
    fn payload_is_trimmed() {
        assert_eq!(classify_line("data:  {\"x\":1}  "), SseLine::Payload("{\"x\":1}"));
        assert_eq!(classify_line("data:{}"), SseLine::Payload("{}"));
    }

    // ── parse_delta ─────────────────────────────────────────────────

    #[test]
    fn content_only() {
        let f = parse_delta(r#"{"choices":[{"index":0,"delta":{"content":"Hello"}}]}"#).unwrap();
        assert_eq!(f.content.as_deref(), Some("Hello"));
        assert_eq!(f.reasoning, None);
    }

    #[test]
    fn reasoning_only() {
        let f = parse_delta(r#"{"choices":[{"delta":{"reasoning_content":"hmm","content":null}}]}"#)
            .unwrap();
        assert_eq!(f.reasoning.as_deref(), Some("hmm"));
        assert_eq!(f.content, None);
    }

    #[test]
    fn reasoning_alias() {
        let f = parse_delta(r#"{"choices":[{"delta":{"reasoning":"r"}}]}"#).unwrap();
        assert_eq!(f.reasoning.as_deref(), Some("r"));
    }

    #[test]
    fn both_reasoning_spellings_keep_content() {
        let f = parse_delta(
            r#"{"choices":[{"delta":{"reasoning_content":"r","reasoning":"r","content":"c"}}]}"#,
        )
        .unwrap();
        assert_eq!(f.reasoning.as_deref(), Some("r"));
        assert_eq!(f.content.as_deref(), Some("c"));

        let f = parse_delta(r#"{"choices":[{"delta":{"reasoning_content":"","reasoning":"alt"}}]}"#)
            .unwrap();
        assert_eq!(f.reasoning.as_deref(), Some("alt"));
    }

    #[test]
    fn both_fragments() {
        let f = parse_delta(r#"{"choices":[{"delta":{"reasoning_content":"r","content":"c"}}]}"#)
            .unwrap();
        assert_eq!(f.reasoning.as_deref(), Some("r"));
        assert_eq!(f.content.as_deref(), Some("c"));
    }

    #[test]
    fn heartbeat_deltas_are_empty() {
        for payload in [
            r#"{"choices":[]}"#,
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":""}}]}"#,
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"total_tokens":3}}"#,
            r#"{}"#,
            r#"{"choices":[{"delta":null,"finish_reason":"stop"}]}"#,
            r#"{"choices":null,"usage":{}}"#,
        ] {
            assert!(parse_delta(payload).unwrap().is_empty(), "payload: {payload}");
        }
    }

    #[test]
    fn malformed_payload_is_error() {
        let err = parse_delta("{not json").unwrap_err();
        assert!(matches!(err, RelayError::InvalidResponse(_)));
        assert!(parse_delta("\"just a string\"").is_err());
    }
}
