//! # edgequake-shot2code
//!
//! Turn a UI screenshot into a single self-contained HTML document using a
//! vision-capable chat model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! screenshot (PNG / JPEG / WebP)
//!  │
//!  ├─ 1. Input     read a local file or download from URL
//!  ├─ 2. Prepare   cap width at 1024px, flatten alpha, JPEG q0.7, base64
//!  ├─ 3. Generate  one chat completion: system prompt + instruction + image
//!  ├─ 4. Unwrap    strip the ```html … ``` fence
//!  └─ 5. Output    markup ready for a sandboxed preview frame
//! ```
//!
//! Two ways to drive it:
//!
//! - [`generate()`] and friends: one call, one result.
//! - [`GenerationSession`]: a state machine for interactive front ends. It
//!   tracks `Idle → Preparing → AwaitingResponse → Succeeded | Failed` and
//!   discards results from pipelines the user has already moved past.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_shot2code::{generate, GenerationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GenerationConfig::builder()
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!     let code = generate("screenshot.png", &config).await?;
//!     println!("{}", code.source_code);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `shot2code` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-shot2code = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::GenerationClient;
pub use config::{Credential, GenerationConfig, GenerationConfigBuilder};
pub use error::{FailureKind, Shot2CodeError};
pub use generate::{generate, generate_from_image, generate_sync, generate_to_file, write_output};
pub use output::{GeneratedCode, GenerationFailure, GenerationResult, GenerationStats};
pub use pipeline::endpoint::{Completion, CompletionEndpoint, GenerationRequest};
pub use pipeline::input::SourceImage;
pub use pipeline::prepare::{ImagePreparer, PreparedPayload};
pub use session::{GenerationSession, PipelineHandle, SessionSnapshot, SessionState};
