//! The remote completion contract.
//!
//! The rest of the crate talks to models only through [`CompletionEndpoint`].
//! Two implementations ship with the crate:
//!
//! - [`crate::pipeline::openai::OpenAiEndpoint`]: any OpenAI-compatible
//!   `/chat/completions` API over plain HTTP. The default.
//! - [`crate::pipeline::provider::ProviderEndpoint`]: an adapter over an
//!   `edgequake_llm::LLMProvider` for Anthropic, Gemini, Ollama and friends.
//!
//! Tests plug in scripted doubles through the same trait.

use crate::config::Credential;
use crate::error::Shot2CodeError;
use crate::pipeline::prepare::PreparedPayload;
use async_trait::async_trait;

/// One multimodal completion request. Built fresh for every attempt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System-role instruction describing the output format.
    pub system_prompt: String,
    /// Text part of the user turn.
    pub user_text: String,
    /// Image part of the user turn.
    pub image: PreparedPayload,
    /// Target model identifier.
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_tokens: usize,
    /// Sampling temperature, when the caller set one.
    pub temperature: Option<f32>,
}

/// What an endpoint returns on success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Raw completion text, fences and all.
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Model reported by the provider, if any.
    pub model: Option<String>,
}

/// A remote multimodal completion endpoint.
///
/// Implementations perform exactly one request per call and never retry.
/// Every failure is returned as a [`Shot2CodeError`] whose `Display` is the
/// best human-readable message available.
#[async_trait]
pub trait CompletionEndpoint: Send + Sync {
    /// Send `request`, authenticating with `credential`.
    async fn complete(
        &self,
        request: &GenerationRequest,
        credential: &Credential,
    ) -> Result<Completion, Shot2CodeError>;

    /// Short provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Whether [`Self::complete`] authenticates with the session credential.
    /// When `false`, the client calls it without one.
    fn requires_credential(&self) -> bool {
        true
    }
}
