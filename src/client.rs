//! Single-shot generation: one prepared screenshot in, one result out.
//!
//! [`GenerationClient`] owns the configuration and the resolved endpoint. It
//! checks the credential before anything touches the network, builds the
//! request, sends it exactly once, and unwraps the code fence from the
//! answer. It never retries; the session decides whether a new attempt
//! happens, and only on an explicit trigger.

use crate::config::{Credential, GenerationConfig};
use crate::error::Shot2CodeError;
use crate::output::{GeneratedCode, GenerationResult, GenerationStats};
use crate::pipeline::endpoint::{CompletionEndpoint, GenerationRequest};
use crate::pipeline::openai::OpenAiEndpoint;
use crate::pipeline::postprocess::strip_code_fences;
use crate::pipeline::prepare::{ImagePreparer, PreparedPayload};
use crate::pipeline::provider::ProviderEndpoint;
use crate::prompts::{system_prompt, USER_INSTRUCTION};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Sends prepared screenshots to a completion endpoint.
#[derive(Clone)]
pub struct GenerationClient {
    config: GenerationConfig,
    endpoint: Arc<dyn CompletionEndpoint>,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("config", &self.config)
            .field("endpoint", &self.endpoint.name())
            .finish()
    }
}

impl GenerationClient {
    /// Build a client, resolving the endpoint from the config.
    ///
    /// Resolution order, most specific first:
    ///
    /// 1. **Pre-built endpoint** (`config.endpoint`): used as-is. This is how
    ///    tests and embedding applications inject their own transport.
    /// 2. **Named provider** (`config.provider_name`): an edgequake-llm
    ///    provider, see [`ProviderEndpoint::from_name`].
    /// 3. **Built-in** [`OpenAiEndpoint`] against `config.base_url`.
    pub fn new(config: GenerationConfig) -> Result<Self, Shot2CodeError> {
        let endpoint: Arc<dyn CompletionEndpoint> = if let Some(ref endpoint) = config.endpoint {
            Arc::clone(endpoint)
        } else if let Some(ref name) = config.provider_name {
            Arc::new(ProviderEndpoint::from_name(name, &config.model)?)
        } else {
            Arc::new(OpenAiEndpoint::new(
                config.base_url.clone(),
                config.api_timeout_secs,
            )?)
        };
        debug!("Resolved endpoint: {}", endpoint.name());
        Ok(Self { config, endpoint })
    }

    /// Build a client around an explicit endpoint, ignoring `config.endpoint`.
    pub fn with_endpoint(config: GenerationConfig, endpoint: Arc<dyn CompletionEndpoint>) -> Self {
        Self { config, endpoint }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn endpoint_name(&self) -> &str {
        self.endpoint.name()
    }

    /// Same endpoint, different credential.
    pub fn with_credential(&self, credential: Option<Credential>) -> Self {
        let mut config = self.config.clone();
        config.credential = credential;
        Self {
            config,
            endpoint: Arc::clone(&self.endpoint),
        }
    }

    /// The preparer matching this client's image settings.
    pub fn preparer(&self) -> ImagePreparer {
        ImagePreparer::from_config(&self.config)
    }

    /// The request that would be sent for `image`.
    pub fn build_request(&self, image: PreparedPayload) -> GenerationRequest {
        GenerationRequest {
            system_prompt: system_prompt(self.config.system_prompt.as_deref()).to_string(),
            user_text: USER_INSTRUCTION.to_string(),
            image,
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    /// Perform one generation, folding any error into the result.
    pub async fn generate(&self, image: &PreparedPayload) -> GenerationResult {
        match self.try_generate(image).await {
            Ok(code) => GenerationResult::Success(code),
            Err(e) => {
                warn!("Generation failed: {}", e);
                GenerationResult::Failure(e.into())
            }
        }
    }

    /// Perform one generation.
    ///
    /// # Errors
    /// - [`Shot2CodeError::MissingCredential`] when no usable credential is
    ///   configured and the endpoint needs one; the endpoint is not called.
    /// - [`Shot2CodeError::EmptyResponse`] when nothing is left after the
    ///   fence is stripped.
    /// - Whatever the endpoint reports, unchanged.
    pub async fn try_generate(&self, image: &PreparedPayload) -> Result<GeneratedCode, Shot2CodeError> {
        let unauthenticated = Credential::new("");
        let credential = match self.config.usable_credential() {
            Some(credential) => credential,
            None if !self.endpoint.requires_credential() => &unauthenticated,
            None => return Err(Shot2CodeError::missing_credential(self.endpoint.name())),
        };

        let request = self.build_request(image.clone());
        info!(
            "Sending {}x{} screenshot to {} ({})",
            image.width,
            image.height,
            self.endpoint.name(),
            request.model
        );

        let start = Instant::now();
        let completion = self.endpoint.complete(&request, credential).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let source_code = strip_code_fences(&completion.content);
        if source_code.trim().is_empty() {
            return Err(Shot2CodeError::EmptyResponse {
                provider: self.endpoint.name().to_string(),
            });
        }
        debug!(
            "{}: {} input tokens, {} output tokens, {} chars, {}ms",
            self.endpoint.name(),
            completion.input_tokens,
            completion.output_tokens,
            source_code.len(),
            duration_ms
        );

        Ok(GeneratedCode {
            source_code,
            stats: GenerationStats {
                model: completion.model.unwrap_or(request.model),
                provider: self.endpoint.name().to_string(),
                input_tokens: completion.input_tokens,
                output_tokens: completion.output_tokens,
                image_width: image.width,
                image_height: image.height,
                duration_ms,
            },
        })
    }
}
