//! Shared helpers for integration tests: a scripted endpoint and in-memory
//! screenshots.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_shot2code::{
    Completion, CompletionEndpoint, Credential, GenerationClient, GenerationConfig,
    GenerationRequest, GenerationSession, Shot2CodeError, SourceImage,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

/// Route library logs to the test harness. `RUST_LOG=edgequake_shot2code=debug`
/// shows them for failing tests; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// One scripted reply. When `gate` is set the call blocks until it is
/// notified, which lets a test hold a pipeline in `AwaitingResponse`.
pub struct Step {
    pub gate: Option<Arc<Notify>>,
    pub reply: Result<String, Shot2CodeError>,
}

impl Step {
    pub fn ok(content: &str) -> Self {
        Self {
            gate: None,
            reply: Ok(content.to_string()),
        }
    }

    pub fn err(error: Shot2CodeError) -> Self {
        Self {
            gate: None,
            reply: Err(error),
        }
    }

    pub fn gated(mut self, gate: &Arc<Notify>) -> Self {
        self.gate = Some(Arc::clone(gate));
        self
    }
}

/// Endpoint double that replays [`Step`]s in order and records every request.
#[derive(Default)]
pub struct ScriptedEndpoint {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(GenerationRequest, String)>>,
}

impl ScriptedEndpoint {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests seen so far, with the credential each one carried.
    pub fn requests(&self) -> Vec<(GenerationRequest, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionEndpoint for ScriptedEndpoint {
    async fn complete(
        &self,
        request: &GenerationRequest,
        credential: &Credential,
    ) -> Result<Completion, Shot2CodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), credential.expose().to_string()));

        let step = self.steps.lock().unwrap().pop_front();
        let Some(step) = step else {
            return Err(Shot2CodeError::Internal("script exhausted".into()));
        };
        if let Some(gate) = step.gate {
            gate.notified().await;
        }
        step.reply.map(|content| Completion {
            content,
            input_tokens: 100,
            output_tokens: 20,
            model: None,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Opaque PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 251) as u8, (y % 241) as u8, 90, 255])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn png_source(width: u32, height: u32) -> SourceImage {
    SourceImage::from_bytes(png_bytes(width, height), Some("image/png"))
}

pub fn config(api_key: Option<&str>) -> GenerationConfig {
    init_tracing();
    let mut builder = GenerationConfig::builder();
    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }
    builder.build().unwrap()
}

pub fn session(endpoint: &Arc<ScriptedEndpoint>, api_key: Option<&str>) -> GenerationSession {
    let endpoint: Arc<dyn CompletionEndpoint> = endpoint.clone();
    GenerationSession::new(GenerationClient::with_endpoint(config(api_key), endpoint))
}
