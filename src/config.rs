//! Configuration types for screenshot-to-code generation.
//!
//! Every knob lives in [`GenerationConfig`], built via its
//! [`GenerationConfigBuilder`]. The config is an explicit value handed to
//! [`crate::client::GenerationClient`] and [`crate::session::GenerationSession`]
//! at construction; nothing is read from ambient state once it is built.

use crate::error::Shot2CodeError;
use crate::pipeline::endpoint::CompletionEndpoint;
use std::fmt;
use std::sync::Arc;

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// An API key, kept in memory only.
///
/// `Debug` never prints the secret, so configs and sessions can be logged
/// freely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whitespace-only keys count as empty.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Configuration for a screenshot-to-code generation.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_shot2code::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .api_key("sk-test")
///     .max_width(1280)
///     .jpeg_quality(0.8)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_width, 1280);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// API key for the endpoint. Generation fails with
    /// [`Shot2CodeError::MissingCredential`] while this is unset or blank,
    /// unless the endpoint authenticates on its own (local providers, mock).
    pub credential: Option<Credential>,

    /// Model identifier. Default: `gpt-4o`.
    pub model: String,

    /// Upper bound on generated tokens. Default: 4096.
    ///
    /// A full landing page in HTML + Tailwind runs 2 000–3 500 tokens; below
    /// that the markup gets truncated mid-element.
    pub max_tokens: usize,

    /// Sampling temperature. Default: `None` (provider default).
    pub temperature: Option<f32>,

    /// Maximum width of the uploaded image in pixels. Default: 1024.
    ///
    /// Wider screenshots are scaled down proportionally. Height is never
    /// capped on its own, so tall full-page captures keep their aspect ratio.
    pub max_width: u32,

    /// JPEG quality in `(0, 1]`. Default: 0.7.
    pub jpeg_quality: f32,

    /// Base URL of the OpenAI-compatible API. Default: `https://api.openai.com/v1`.
    pub base_url: String,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Per-request timeout in seconds. Default: `None` (transport limits only).
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// edgequake-llm provider name (e.g. "anthropic", "gemini", "ollama").
    /// When set, requests go through that provider instead of the built-in
    /// OpenAI-compatible endpoint. Hosted providers use `credential` as
    /// their API key.
    pub provider_name: Option<String>,

    /// Pre-constructed endpoint. Takes precedence over `provider_name`.
    pub endpoint: Option<Arc<dyn CompletionEndpoint>>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            credential: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            temperature: None,
            max_width: 1024,
            jpeg_quality: 0.7,
            base_url: DEFAULT_BASE_URL.to_string(),
            system_prompt: None,
            api_timeout_secs: None,
            download_timeout_secs: 120,
            provider_name: None,
            endpoint: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("credential", &self.credential)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("max_width", &self.max_width)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("base_url", &self.base_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("provider_name", &self.provider_name)
            .field(
                "endpoint",
                &self.endpoint.as_ref().map(|e| e.name().to_string()),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// The credential, if one is configured and non-blank.
    pub fn usable_credential(&self) -> Option<&Credential> {
        self.credential.as_ref().filter(|c| !c.is_empty())
    }

    /// JPEG encoder quality on the 1–100 scale.
    pub fn encoder_quality(&self) -> u8 {
        (self.jpeg_quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn credential(mut self, credential: Credential) -> Self {
        self.config.credential = Some(credential);
        self
    }

    pub fn api_key(self, key: impl Into<String>) -> Self {
        self.credential(Credential::new(key))
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_width(mut self, px: u32) -> Self {
        self.config.max_width = px;
        self
    }

    pub fn jpeg_quality(mut self, q: f32) -> Self {
        self.config.jpeg_quality = q.clamp(0.01, 1.0);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn endpoint(mut self, endpoint: Arc<dyn CompletionEndpoint>) -> Self {
        self.config.endpoint = Some(endpoint);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, Shot2CodeError> {
        let c = &self.config;
        if c.max_width == 0 {
            return Err(Shot2CodeError::InvalidConfig(
                "max_width must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(Shot2CodeError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(Shot2CodeError::InvalidConfig("model must not be empty".into()));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(Shot2CodeError::InvalidConfig(format!(
                "base_url must be an HTTP/HTTPS URL, got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = GenerationConfig::default();
        assert_eq!(c.model, "gpt-4o");
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.max_width, 1024);
        assert!((c.jpeg_quality - 0.7).abs() < f32::EPSILON);
        assert_eq!(c.encoder_quality(), 70);
        assert!(c.credential.is_none());
        assert!(c.api_timeout_secs.is_none());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let c = Credential::new("sk-very-secret");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-very-secret"), "got: {dbg}");

        let config = GenerationConfig::builder().api_key("sk-very-secret").build().unwrap();
        assert!(!format!("{config:?}").contains("sk-very-secret"));
    }

    #[test]
    fn blank_credential_is_not_usable() {
        let config = GenerationConfig::builder().api_key("   ").build().unwrap();
        assert!(config.usable_credential().is_none());

        let config = GenerationConfig::builder().api_key("sk-1").build().unwrap();
        assert_eq!(config.usable_credential().map(|c| c.expose()), Some("sk-1"));
    }

    #[test]
    fn quality_is_clamped() {
        let c = GenerationConfig::builder().jpeg_quality(7.0).build().unwrap();
        assert_eq!(c.encoder_quality(), 100);
        let c = GenerationConfig::builder().jpeg_quality(-1.0).build().unwrap();
        assert_eq!(c.encoder_quality(), 1);
    }

    #[test]
    fn zero_width_is_rejected() {
        let err = GenerationConfig::builder().max_width(0).build().unwrap_err();
        assert!(matches!(err, Shot2CodeError::InvalidConfig(_)));
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let err = GenerationConfig::builder()
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }
}
