//! Adapter from [`CompletionEndpoint`] to an `edgequake_llm::LLMProvider`.
//!
//! Hosted providers that authenticate with a single API key (OpenAI,
//! Anthropic, Gemini, OpenRouter) are built per call from the credential the
//! client checked, so that key is the one sent. Everything else (local
//! servers, the mock, providers with multi-part auth such as Azure) is built
//! once through [`ProviderFactory::create_llm_provider`] and authenticates on
//! its own; those endpoints do not require a session credential.

use crate::config::Credential;
use crate::error::Shot2CodeError;
use crate::pipeline::endpoint::{Completion, CompletionEndpoint, GenerationRequest};
use async_trait::async_trait;
use edgequake_llm::{
    AnthropicProvider, ChatMessage, CompletionOptions, GeminiProvider, ImageData, LLMProvider,
    OpenAIProvider, OpenRouterProvider, ProviderFactory,
};
use std::sync::Arc;
use tracing::debug;

/// Hosted providers whose only credential is an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyedProvider {
    OpenAi,
    Anthropic,
    Gemini,
    OpenRouter,
}

impl KeyedProvider {
    /// Parse a provider name, accepting the aliases edgequake-llm accepts.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "gemini" | "google" => Some(Self::Gemini),
            "openrouter" | "open-router" => Some(Self::OpenRouter),
            _ => None,
        }
    }

    /// Environment variable the CLI reads the key from.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    /// Where users create a key.
    pub fn key_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://platform.openai.com/api-keys",
            Self::Anthropic => "https://console.anthropic.com/settings/keys",
            Self::Gemini => "https://aistudio.google.com/app/apikey",
            Self::OpenRouter => "https://openrouter.ai/keys",
        }
    }

    fn build(self, api_key: &str, model: &str) -> Arc<dyn LLMProvider> {
        match self {
            Self::OpenAi => Arc::new(OpenAIProvider::new(api_key).with_model(model)),
            Self::Anthropic => Arc::new(AnthropicProvider::new(api_key).with_model(model)),
            Self::Gemini => Arc::new(GeminiProvider::new(api_key).with_model(model)),
            Self::OpenRouter => Arc::new(OpenRouterProvider::new(api_key).with_model(model)),
        }
    }
}

enum Backend {
    /// Built once, authenticates itself.
    Ready(Arc<dyn LLMProvider>),
    /// Built per call from the credential.
    Keyed { provider: KeyedProvider, model: String },
}

/// A [`CompletionEndpoint`] backed by an edgequake-llm provider.
pub struct ProviderEndpoint {
    name: String,
    backend: Backend,
}

impl ProviderEndpoint {
    /// Wrap an already-built provider. The session credential is not used.
    pub fn new(name: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            backend: Backend::Ready(provider),
        }
    }

    /// Resolve a provider by name (`openai`, `anthropic`, `gemini`,
    /// `openrouter`, `ollama`, `lmstudio`, `mock`, …).
    ///
    /// Keyed providers are authenticated with the credential passed to
    /// [`CompletionEndpoint::complete`]. Other names go through
    /// [`ProviderFactory::create_llm_provider`] right away, so a local
    /// provider that cannot be set up fails here with
    /// [`Shot2CodeError::ProviderNotConfigured`].
    pub fn from_name(provider_name: &str, model: &str) -> Result<Self, Shot2CodeError> {
        if let Some(provider) = KeyedProvider::from_name(provider_name) {
            return Ok(Self {
                name: provider_name.to_string(),
                backend: Backend::Keyed {
                    provider,
                    model: model.to_string(),
                },
            });
        }
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            Shot2CodeError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider_name, provider))
    }

    fn provider_for(&self, credential: &Credential) -> Arc<dyn LLMProvider> {
        match &self.backend {
            Backend::Ready(provider) => Arc::clone(provider),
            Backend::Keyed { provider, model } => provider.build(credential.expose(), model),
        }
    }
}

#[async_trait]
impl CompletionEndpoint for ProviderEndpoint {
    async fn complete(
        &self,
        request: &GenerationRequest,
        credential: &Credential,
    ) -> Result<Completion, Shot2CodeError> {
        let provider = self.provider_for(credential);

        let image = ImageData::new(request.image.base64.clone(), request.image.media_type());
        let messages = vec![
            ChatMessage::system(request.system_prompt.as_str()),
            ChatMessage::user_with_images(request.user_text.as_str(), vec![image]),
        ];
        let options = CompletionOptions {
            temperature: request.temperature,
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| Shot2CodeError::Api {
                provider: self.name.clone(),
                status: None,
                message: format!("{e}"),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.name, response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(Shot2CodeError::EmptyResponse {
                provider: self.name.clone(),
            });
        }

        let input_tokens = response.prompt_tokens as u64;
        let output_tokens = response.completion_tokens as u64;
        Ok(Completion {
            content: response.content.clone(),
            input_tokens,
            output_tokens,
            model: Some(request.model.clone()),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn requires_credential(&self) -> bool {
        matches!(self.backend, Backend::Keyed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::prepare::PreparedPayload;
    use edgequake_llm::{ChatRole, LLMResponse, MockProvider};
    use std::sync::Mutex;

    /// Records what it was asked and answers with a fixed text.
    struct RecordingProvider {
        reply: String,
        seen: Mutex<Vec<(Vec<ChatMessage>, Option<CompletionOptions>)>>,
    }

    impl RecordingProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "recording-model"
        }

        fn max_context_length(&self) -> usize {
            128_000
        }

        async fn complete(&self, _prompt: &str) -> edgequake_llm::Result<LLMResponse> {
            Ok(LLMResponse::new(self.reply.clone(), "recording-model"))
        }

        async fn complete_with_options(
            &self,
            prompt: &str,
            _options: &CompletionOptions,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.complete(prompt).await
        }

        async fn chat(
            &self,
            messages: &[ChatMessage],
            options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((messages.to_vec(), options.cloned()));
            let mut response = LLMResponse::new(self.reply.clone(), "recording-model");
            response.prompt_tokens = 812;
            response.completion_tokens = 64;
            Ok(response)
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_prompt: "Be a frontend developer.".into(),
            user_text: "Generate code for this screenshot.".into(),
            image: PreparedPayload {
                width: 640,
                height: 480,
                original_width: 640,
                original_height: 480,
                base64: "QUJD".into(),
            },
            model: "gpt-4o".into(),
            max_tokens: 2048,
            temperature: Some(0.2),
        }
    }

    #[tokio::test]
    async fn sends_system_turn_then_user_turn_with_jpeg() {
        let provider = Arc::new(RecordingProvider::new("<div>ok</div>"));
        let endpoint = ProviderEndpoint::new("recording", provider.clone());

        let completion = endpoint
            .complete(&request(), &Credential::new(""))
            .await
            .unwrap();
        assert_eq!(completion.content, "<div>ok</div>");
        assert_eq!((completion.input_tokens, completion.output_tokens), (812, 64));
        assert_eq!(completion.model.as_deref(), Some("gpt-4o"));

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (messages, options) = &seen[0];
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[0].content, "Be a frontend developer.");
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[1].content, "Generate code for this screenshot.");
        let images = messages[1].images.as_ref().unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].mime_type, "image/jpeg");
        assert_eq!(images[0].data, "QUJD");

        let options = options.as_ref().unwrap();
        assert_eq!(options.max_tokens, Some(2048));
        assert_eq!(options.temperature, Some(0.2));
    }

    #[tokio::test]
    async fn blank_reply_is_empty_response() {
        let mock = MockProvider::new();
        mock.add_response("  \n").await;
        let endpoint = ProviderEndpoint::new("mock", Arc::new(mock));

        let err = endpoint
            .complete(&request(), &Credential::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, Shot2CodeError::EmptyResponse { ref provider } if provider == "mock"));
    }

    #[tokio::test]
    async fn mock_reply_is_passed_through_raw() {
        let mock = MockProvider::new();
        mock.add_response("```html\n<p>x</p>\n```").await;
        let endpoint = ProviderEndpoint::new("mock", Arc::new(mock));

        let completion = endpoint
            .complete(&request(), &Credential::new(""))
            .await
            .unwrap();
        assert_eq!(completion.content, "```html\n<p>x</p>\n```");
    }

    #[test]
    fn keyed_names_and_aliases() {
        assert_eq!(KeyedProvider::from_name("openai"), Some(KeyedProvider::OpenAi));
        assert_eq!(KeyedProvider::from_name("Claude"), Some(KeyedProvider::Anthropic));
        assert_eq!(KeyedProvider::from_name("google"), Some(KeyedProvider::Gemini));
        assert_eq!(KeyedProvider::from_name("open-router"), Some(KeyedProvider::OpenRouter));
        assert_eq!(KeyedProvider::from_name("ollama"), None);
        assert_eq!(KeyedProvider::Anthropic.env_var(), "ANTHROPIC_API_KEY");
    }

    #[test]
    fn keyed_provider_is_built_from_the_credential_and_model() {
        let endpoint = ProviderEndpoint::from_name("anthropic", "claude-3-5-sonnet").unwrap();
        assert!(endpoint.requires_credential());
        let provider = endpoint.provider_for(&Credential::new("sk-ant-test"));
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.model(), "claude-3-5-sonnet");
    }

    #[test]
    fn factory_providers_do_not_need_a_credential() {
        let endpoint = ProviderEndpoint::from_name("mock", "any").unwrap();
        assert!(!endpoint.requires_credential());
        assert_eq!(endpoint.name(), "mock");

        let wrapped = ProviderEndpoint::new("mock", Arc::new(MockProvider::new()));
        assert!(!wrapped.requires_credential());
    }
}
