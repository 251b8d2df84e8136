//! Error types for the edgequake-shot2code library.
//!
//! There is one error enum, [`Shot2CodeError`], because every failure in a
//! generation attempt is terminal: nothing is retried, nothing is partially
//! usable. The session layer does not propagate it as a Rust error. It folds
//! it into a [`crate::output::GenerationFailure`] and stores that as the
//! session state, so the presentation layer always gets a message to show.
//!
//! [`FailureKind`] is the coarse classification the presentation layer
//! branches on (e.g. showing "where to get an API key" only for
//! [`FailureKind::MissingCredential`]).

use crate::pipeline::provider::KeyedProvider;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Fallback text when a provider fails without a human-readable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate code. Please check your API key.";

/// All errors returned by the edgequake-shot2code library.
#[derive(Debug, Error)]
pub enum Shot2CodeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path exists but reading it failed (a directory, an I/O error).
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input string is neither a file path nor a valid URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Image errors ──────────────────────────────────────────────────────
    /// The bytes could not be decoded as a raster image.
    #[error("Could not decode the image: {detail}\nSupported formats: PNG, JPEG, WEBP.")]
    Decode { detail: String },

    /// Re-encoding the prepared bitmap failed.
    #[error("Could not encode the prepared image: {detail}")]
    Encode { detail: String },

    // ── Credential / config errors ────────────────────────────────────────
    /// No API key was configured for a provider that needs one. No request
    /// was sent.
    #[error("Missing API key for '{provider}'. Please add it in the settings.\n\nHow to fix:\n{hint}")]
    MissingCredential { provider: String, hint: String },

    /// The configured provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Endpoint errors ───────────────────────────────────────────────────
    /// The request never produced an HTTP response (DNS, TLS, reset, timeout).
    #[error("Network error talking to '{provider}': {message}")]
    Transport { provider: String, message: String },

    /// The provider rejected the credential (401/403).
    #[error("{message}")]
    Auth { provider: String, message: String },

    /// The provider answered with an error other than authentication.
    #[error("{message}")]
    Api {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// The provider answered successfully but without any completion text.
    #[error("The model returned an empty response. Try again with a clearer screenshot.")]
    EmptyResponse { provider: String },

    /// The provider's response body could not be understood.
    #[error("Unexpected response from '{provider}': {detail}")]
    MalformedResponse { provider: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Shot2CodeError {
    /// `MissingCredential` with remediation steps for `provider`.
    pub fn missing_credential(provider: &str) -> Self {
        let hint = match KeyedProvider::from_name(provider) {
            Some(keyed) => format!(
                "  1. Get your API key from {}\n  2. Pass it with --api-key or set {}.",
                keyed.key_url(),
                keyed.env_var()
            ),
            None => format!(
                "  1. Create an API key in your '{provider}' account\n  2. Pass it with --api-key."
            ),
        };
        Shot2CodeError::MissingCredential {
            provider: provider.to_string(),
            hint,
        }
    }

    /// Coarse classification for the presentation layer.
    pub fn kind(&self) -> FailureKind {
        match self {
            Shot2CodeError::FileNotFound { .. }
            | Shot2CodeError::PermissionDenied { .. }
            | Shot2CodeError::ReadFailed { .. }
            | Shot2CodeError::InvalidInput { .. }
            | Shot2CodeError::DownloadFailed { .. }
            | Shot2CodeError::DownloadTimeout { .. } => FailureKind::Input,
            Shot2CodeError::Decode { .. } | Shot2CodeError::Encode { .. } => FailureKind::Decode,
            Shot2CodeError::MissingCredential { .. } => FailureKind::MissingCredential,
            Shot2CodeError::ProviderNotConfigured { .. } | Shot2CodeError::InvalidConfig(_) => {
                FailureKind::Config
            }
            Shot2CodeError::Transport { .. } => FailureKind::Transport,
            Shot2CodeError::Auth { .. } => FailureKind::Auth,
            Shot2CodeError::Api { .. } => FailureKind::Api,
            Shot2CodeError::EmptyResponse { .. } | Shot2CodeError::MalformedResponse { .. } => {
                FailureKind::EmptyResponse
            }
            Shot2CodeError::OutputWriteFailed { .. } | Shot2CodeError::Internal(_) => {
                FailureKind::Internal
            }
        }
    }
}

/// What went wrong, at the granularity a user interface cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The image could not be loaded (path, permissions, download).
    Input,
    /// The image could not be decoded or re-encoded.
    Decode,
    /// No credential configured; no request was sent.
    MissingCredential,
    /// Provider setup or builder validation failed.
    Config,
    /// Network-level failure.
    Transport,
    /// The provider rejected the credential.
    Auth,
    /// The provider reported an error.
    Api,
    /// The provider returned nothing usable.
    EmptyResponse,
    /// Anything else.
    Internal,
}
