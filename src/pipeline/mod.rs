//! Pipeline stages for screenshot-to-code generation.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the transport can be swapped without touching image handling.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ prepare ──▶ endpoint ──▶ postprocess
//! (path/URL) (resize,    (openai /    (unwrap
//!            JPEG, b64)   provider)    fence)
//! ```
//!
//! 1. [`input`]: load the user-supplied path or URL into a [`input::SourceImage`]
//! 2. [`prepare`]: cap the width, flatten, JPEG-encode and base64-wrap; runs
//!    in `spawn_blocking` because decoding a large screenshot is CPU-bound
//! 3. [`endpoint`]: the [`endpoint::CompletionEndpoint`] seam, implemented by
//!    [`openai`] (direct HTTP) and [`provider`] (edgequake-llm)
//! 4. [`postprocess`]: strip the enclosing Markdown code fence

pub mod endpoint;
pub mod input;
pub mod openai;
pub mod postprocess;
pub mod prepare;
pub mod provider;
