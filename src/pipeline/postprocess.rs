//! Post-processing: unwrap the completion from a Markdown code fence.
//!
//! The system prompt asks for bare HTML, but chat models trained on Markdown
//! still answer with ` ```html … ``` ` often enough that the preview would
//! otherwise show literal backticks. This is the only cleanup performed: the
//! markup itself is passed through untouched, even when it is not
//! well-formed, because the preview sandbox renders whatever it is given.

use once_cell::sync::Lazy;
use regex::Regex;

// Opening fence line, optionally with a language tag (```html, ```jsx, ```).
static RE_OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*```[A-Za-z0-9_+.#-]*[ \t]*\r?\n").unwrap());

// Whole answer fenced on one line: ```<div>Hi</div>```. No language tag.
static RE_INLINE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*```([^`\r\n]+)```\s*$").unwrap());

// Closing fence at the very end, together with the line break before it.
static RE_CLOSING_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\r?\n)?```\s*$").unwrap());

/// Strip one enclosing code fence from a completion.
///
/// The opening fence line is removed once; the closing fence is removed once
/// if present (a response cut off by the token limit has none). A single
/// line wrapped in fences on both sides is unwrapped as a whole. Text that
/// does not start with a fence is returned unchanged.
pub fn strip_code_fences(input: &str) -> String {
    let Some(opening) = RE_OPENING_FENCE.find(input) else {
        return match RE_INLINE_FENCE.captures(input) {
            Some(caps) => caps[1].trim().to_string(),
            None => input.to_string(),
        };
    };
    let body = &input[opening.end()..];
    RE_CLOSING_FENCE.replace(body, "").into_owned()
}
