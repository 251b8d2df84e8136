//! One-shot entry points: screenshot in, markup out, no session.
//!
//! These run the same three stages as [`crate::session::GenerationSession`]
//! (prepare → send → unwrap) but return the outcome directly instead of
//! publishing it as session state. Use them from scripts and the CLI's
//! non-interactive paths.

use crate::client::GenerationClient;
use crate::config::GenerationConfig;
use crate::error::Shot2CodeError;
use crate::output::GeneratedCode;
use crate::pipeline::input::{self, SourceImage};
use crate::pipeline::prepare::prepare_async;
use std::path::Path;
use tracing::info;

/// Generate markup for a screenshot given as a local path or HTTP(S) URL.
///
/// # Errors
/// - Input errors: file not found, permission denied, download failure
/// - [`Shot2CodeError::Decode`] when the bytes are not an image
/// - [`Shot2CodeError::MissingCredential`] when the endpoint needs an API
///   key and none is configured
/// - Endpoint errors, unchanged
pub async fn generate(
    input_str: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<GeneratedCode, Shot2CodeError> {
    let input_str = input_str.as_ref();
    info!("Generating code for {}", input_str);
    let source = input::resolve_input(input_str, config.download_timeout_secs).await?;
    generate_from_image(source, config).await
}

/// Generate markup for an image already in memory.
pub async fn generate_from_image(
    source: SourceImage,
    config: &GenerationConfig,
) -> Result<GeneratedCode, Shot2CodeError> {
    let client = GenerationClient::new(config.clone())?;
    let prepared = prepare_async(client.preparer(), source).await?;
    client.try_generate(&prepared).await
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally; do not call it from inside
/// an async context.
pub fn generate_sync(
    input_str: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<GeneratedCode, Shot2CodeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Shot2CodeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(input_str, config))
}

/// Generate markup and write it to `output_path`.
pub async fn generate_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GeneratedCode, Shot2CodeError> {
    let code = generate(input_str, config).await?;
    write_output(output_path.as_ref(), &code.source_code).await?;
    Ok(code)
}

/// Write `contents` to `path` via a sibling temp file and a rename, so a
/// reader never sees a half-written document.
pub async fn write_output(path: &Path, contents: &str) -> Result<(), Shot2CodeError> {
    let write_err = |e: std::io::Error| Shot2CodeError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    info!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[tokio::test]
    async fn write_output_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/index.html");
        write_output(&path, "<p>x</p>").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<p>x</p>");
        assert!(!dir.path().join("nested/out/index.html.tmp").exists());
    }

    #[tokio::test]
    async fn write_output_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.html");
        std::fs::write(&path, "old").unwrap();
        write_output(&path, "new").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[tokio::test]
    async fn missing_file_is_an_input_error() {
        let config = GenerationConfig::builder().api_key("sk-test").build().unwrap();
        let err = generate("/definitely/not/here.png", &config).await.unwrap_err();
        assert!(matches!(err, Shot2CodeError::FileNotFound { .. }));
        assert_eq!(err.kind(), FailureKind::Input);
    }

    #[tokio::test]
    async fn undecodable_bytes_fail_before_credential_check() {
        let source = SourceImage::from_bytes(b"plain text".to_vec(), Some("image/png"));
        let err = generate_from_image(source, &GenerationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Shot2CodeError::Decode { .. }));
    }

    #[test]
    fn sync_wrapper_reports_errors() {
        let err = generate_sync("/definitely/not/here.png", &GenerationConfig::default()).unwrap_err();
        assert!(matches!(err, Shot2CodeError::FileNotFound { .. }));
    }
}
