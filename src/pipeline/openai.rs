//! OpenAI-compatible `/chat/completions` endpoint over reqwest.
//!
//! Speaks the plain JSON wire format, so it works against OpenAI itself and
//! against any compatible gateway (Azure proxies, LiteLLM, vLLM, Ollama's
//! `/v1`). The credential is passed per call rather than read from the
//! environment, so the key the user configured is exactly the key that is
//! sent.
//!
//! ## Error mapping
//!
//! | Outcome | Error |
//! |---|---|
//! | no HTTP response (DNS, TLS, reset, timeout) | [`Shot2CodeError::Transport`] |
//! | 401 / 403 | [`Shot2CodeError::Auth`] |
//! | any other non-2xx | [`Shot2CodeError::Api`] |
//! | 2xx, body not JSON / unexpected shape | [`Shot2CodeError::MalformedResponse`] |
//! | 2xx, no choices or blank content | [`Shot2CodeError::EmptyResponse`] |
//!
//! Provider error bodies (`{"error": {"message": …}}`) supply the message
//! when present; otherwise [`GENERIC_FAILURE_MESSAGE`] is used.

use crate::config::Credential;
use crate::error::{Shot2CodeError, GENERIC_FAILURE_MESSAGE};
use crate::pipeline::endpoint::{Completion, CompletionEndpoint, GenerationRequest};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER: &str = "openai";

/// Client for an OpenAI-compatible chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiEndpoint {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: Option<u64>,
}

impl OpenAiEndpoint {
    /// `base_url` is the API root, e.g. `https://api.openai.com/v1`.
    pub fn new(base_url: impl Into<String>, timeout_secs: Option<u64>) -> Result<Self, Shot2CodeError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| Shot2CodeError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionEndpoint for OpenAiEndpoint {
    async fn complete(
        &self,
        request: &GenerationRequest,
        credential: &Credential,
    ) -> Result<Completion, Shot2CodeError> {
        let data_uri = request.image.data_uri();
        let body = ChatRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(&request.system_prompt),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: &request.user_text,
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: &data_uri },
                        },
                    ]),
                },
            ],
        };

        let url = self.completions_url();
        debug!("POST {} (model={}, image {} bytes b64)", url, request.model, request.image.base64.len());

        let response = self
            .http
            .post(&url)
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let message = match (e.is_timeout(), self.timeout_secs) {
                    (true, Some(secs)) => format!("request timed out after {secs}s"),
                    _ => e.to_string(),
                };
                Shot2CodeError::Transport {
                    provider: PROVIDER.to_string(),
                    message,
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| Shot2CodeError::Transport {
            provider: PROVIDER.to_string(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let message = provider_message(&text).unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
            warn!("{} answered HTTP {}: {}", PROVIDER, status.as_u16(), message);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Shot2CodeError::Auth {
                    provider: PROVIDER.to_string(),
                    message,
                },
                _ => Shot2CodeError::Api {
                    provider: PROVIDER.to_string(),
                    status: Some(status.as_u16()),
                    message,
                },
            });
        }

        parse_completion(&text)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

/// Parse a successful response body.
fn parse_completion(body: &str) -> Result<Completion, Shot2CodeError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| Shot2CodeError::MalformedResponse {
            provider: PROVIDER.to_string(),
            detail: e.to_string(),
        })?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| Shot2CodeError::EmptyResponse {
            provider: PROVIDER.to_string(),
        })?;

    let usage = parsed.usage.unwrap_or_default();
    Ok(Completion {
        content,
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
        model: parsed.model,
    })
}

/// Pull `error.message` out of an error body, if there is one.
fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.message)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4o",
            max_tokens: 4096,
            temperature: None,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text("sys"),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text { text: "hi" },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: "data:image/jpeg;base64,AAAA",
                            },
                        },
                    ]),
                },
            ],
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "gpt-4o");
        assert_eq!(v["max_tokens"], 4096);
        assert!(v.get("temperature").is_none());
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][0]["content"], "sys");
        assert_eq!(v["messages"][1]["content"][0]["type"], "text");
        assert_eq!(v["messages"][1]["content"][1]["type"], "image_url");
        assert_eq!(
            v["messages"][1]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[test]
    fn parses_choice_and_usage() {
        let body = r#"{"model":"gpt-4o-2024-08-06","choices":[{"message":{"role":"assistant","content":"<div>Hi</div>"}}],"usage":{"prompt_tokens":812,"completion_tokens":40}}"#;
        let c = parse_completion(body).unwrap();
        assert_eq!(c.content, "<div>Hi</div>");
        assert_eq!(c.input_tokens, 812);
        assert_eq!(c.output_tokens, 40);
        assert_eq!(c.model.as_deref(), Some("gpt-4o-2024-08-06"));
    }

    #[test]
    fn no_choices_is_empty_response() {
        let err = parse_completion(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, Shot2CodeError::EmptyResponse { .. }));
    }

    #[test]
    fn null_content_is_empty_response() {
        let err = parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap_err();
        assert!(matches!(err, Shot2CodeError::EmptyResponse { .. }));
    }

    #[test]
    fn non_json_is_malformed() {
        let err = parse_completion("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, Shot2CodeError::MalformedResponse { .. }));
    }

    #[test]
    fn provider_message_extraction() {
        let body = r#"{"error":{"message":"Incorrect API key provided.","type":"invalid_request_error"}}"#;
        assert_eq!(provider_message(body).as_deref(), Some("Incorrect API key provided."));
        assert_eq!(provider_message("not json"), None);
        assert_eq!(provider_message(r#"{"error":{"message":"  "}}"#), None);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let e = OpenAiEndpoint::new("http://localhost:8080/v1/", None).unwrap();
        assert_eq!(e.completions_url(), "http://localhost:8080/v1/chat/completions");
    }
}
