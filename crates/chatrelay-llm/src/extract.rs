//! Answer / reasoning extraction for blocking responses.
//!
//! Two tiers, the first winning whenever it applies:
//!
//! 1. a structured reasoning field on the message is used verbatim, and
//!    the content is the answer verbatim;
//! 2. otherwise, the first `<think>...</think>` pair in the content is
//!    lifted out as reasoning and removed from the answer.

use std::sync::LazyLock;

use regex::Regex;

use chatrelay_types::CompletionResult;

use crate::types::ResponseMessage;

const THINK_OPEN: &str = "<think>";

static THINK_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<think>(.*?)</think>").expect("think-block pattern is valid")
});

/// Split a response message into answer and optional reasoning.
pub fn extract_result(message: &ResponseMessage) -> CompletionResult {
    let content = message.content.as_deref().unwrap_or_default();

    if let Some(reasoning) = message.reasoning_text() {
        return CompletionResult::new(content, reasoning);
    }

    if content.contains(THINK_OPEN)
        && let Some(captures) = THINK_BLOCK.captures(content)
    {
        let reasoning = captures.get(1).map_or("", |m| m.as_str()).trim();
        let answer = THINK_BLOCK.replace_all(content, "");
        return CompletionResult::new(answer.trim(), reasoning);
    }

    CompletionResult::new(content, "")
}
