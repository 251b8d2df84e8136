//! Result types handed to the presentation layer.

use crate::error::{FailureKind, Shot2CodeError};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Outcome of one generation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    Success(GeneratedCode),
    Failure(GenerationFailure),
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    /// The generated markup, if the attempt succeeded.
    pub fn source_code(&self) -> Option<&str> {
        match self {
            GenerationResult::Success(code) => Some(&code.source_code),
            GenerationResult::Failure(_) => None,
        }
    }

    pub fn into_result(self) -> Result<GeneratedCode, GenerationFailure> {
        match self {
            GenerationResult::Success(code) => Ok(code),
            GenerationResult::Failure(f) => Err(f),
        }
    }
}

/// Markup produced from a screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCode {
    /// Completion text with the enclosing code fence removed.
    pub source_code: String,
    pub stats: GenerationStats,
}

impl GeneratedCode {
    /// Line-numbered view of the markup, as shown in the code tab.
    pub fn listing(&self) -> String {
        let lines: Vec<&str> = self.source_code.lines().collect();
        let width = lines.len().max(1).to_string().len();
        let mut out = String::with_capacity(self.source_code.len() + lines.len() * (width + 3));
        for (i, line) in lines.iter().enumerate() {
            let _ = writeln!(out, "{:>width$} │ {}", i + 1, line, width = width);
        }
        out
    }
}

/// Per-attempt statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Model that answered (as reported by the provider when available).
    pub model: String,
    /// Endpoint name, e.g. `openai`.
    pub provider: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Dimensions of the image that was sent.
    pub image_width: u32,
    pub image_height: u32,
    /// Time spent waiting for the endpoint.
    pub duration_ms: u64,
}

/// A failed attempt, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerationFailure {
    /// True when the user has to supply a credential before trying again.
    pub fn needs_credential(&self) -> bool {
        self.kind == FailureKind::MissingCredential
    }
}

impl From<&Shot2CodeError> for GenerationFailure {
    fn from(err: &Shot2CodeError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<Shot2CodeError> for GenerationFailure {
    fn from(err: Shot2CodeError) -> Self {
        Self::from(&err)
    }
}

impl std::fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GenerationFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(src: &str) -> GeneratedCode {
        GeneratedCode {
            source_code: src.to_string(),
            stats: GenerationStats::default(),
        }
    }

    #[test]
    fn listing_numbers_lines() {
        let listing = code("<div>\n  <p>Hi</p>\n</div>").listing();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "1 │ <div>");
        assert_eq!(lines[1], "2 │   <p>Hi</p>");
    }

    #[test]
    fn listing_pads_numbers() {
        let src = (1..=12).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n");
        let listing = code(&src).listing();
        assert!(listing.starts_with(" 1 │ l1\n"), "got: {listing}");
        assert!(listing.contains("12 │ l12"));
    }

    #[test]
    fn failure_from_error_keeps_kind_and_message() {
        let f = GenerationFailure::from(Shot2CodeError::missing_credential("openai"));
        assert!(f.needs_credential());
        assert!(f.message.contains("API key"));
    }

    #[test]
    fn result_accessors() {
        let ok = GenerationResult::Success(code("<a/>"));
        assert!(ok.is_success());
        assert_eq!(ok.source_code(), Some("<a/>"));

        let err = GenerationResult::Failure(GenerationFailure {
            kind: FailureKind::Transport,
            message: "connection reset".into(),
        });
        assert_eq!(err.source_code(), None);
        assert_eq!(err.into_result().unwrap_err().to_string(), "connection reset");
    }

    #[test]
    fn result_serialises_with_status_tag() {
        let v = serde_json::to_value(GenerationResult::Success(code("<a/>"))).unwrap();
        assert_eq!(v["status"], "success");
        assert_eq!(v["source_code"], "<a/>");
    }
}
