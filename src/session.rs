//! The generation session: one selected screenshot, one pipeline, one state.
//!
//! ```text
//!            select_image                prepared               Ok
//!   Idle ───────────────▶ Preparing ───────────────▶ AwaitingResponse ────▶ Succeeded
//!    ▲                        │                              │
//!    │ reset                  │ decode error                 │ any failure
//!    │                        ▼                              ▼
//!    └──────────────────── Failed ◀──────────────────────────┘
//! ```
//!
//! `Succeeded` and `Failed` are terminal. A new pipeline starts only on an
//! external trigger: [`GenerationSession::select_image`],
//! [`GenerationSession::retry`] or [`GenerationSession::set_credential`].
//!
//! ## Staleness
//!
//! Every trigger bumps a generation counter that lives next to the state in
//! one `watch` channel. A pipeline remembers the generation it was started
//! for and writes through `send_if_modified`, which compares and updates
//! under the channel's lock. Once the user has moved on, the old pipeline's
//! writes are dropped; it may still finish its HTTP request, but nobody sees
//! the answer.

use crate::client::GenerationClient;
use crate::config::Credential;
use crate::output::{GeneratedCode, GenerationFailure, GenerationResult};
use crate::pipeline::input::SourceImage;
use crate::pipeline::prepare::prepare_async;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

/// Where the session currently is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Preparing,
    AwaitingResponse,
    Succeeded(GeneratedCode),
    Failed(GenerationFailure),
}

impl SessionState {
    /// Preparing or waiting on the endpoint.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SessionState::Preparing | SessionState::AwaitingResponse)
    }

    /// Succeeded or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Succeeded(_) | SessionState::Failed(_))
    }

    fn from_result(result: GenerationResult) -> Self {
        match result {
            GenerationResult::Success(code) => SessionState::Succeeded(code),
            GenerationResult::Failure(failure) => SessionState::Failed(failure),
        }
    }
}

/// State plus the generation it belongs to.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Incremented on every trigger and reset.
    pub generation: u64,
    pub state: SessionState,
    image: Option<SourceImage>,
}

impl SessionSnapshot {
    /// The currently selected image, if any.
    pub fn image(&self) -> Option<&SourceImage> {
        self.image.as_ref()
    }
}

/// Handle to a started pipeline.
#[derive(Debug)]
pub struct PipelineHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl PipelineHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the pipeline task to finish, whether or not its result was
    /// still current.
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            warn!("Pipeline {} task ended abnormally: {}", self.generation, e);
        }
    }
}

/// Orchestrates preparation and generation for the selected screenshot.
///
/// Must be used from within a tokio runtime: triggers spawn the pipeline as
/// a task.
pub struct GenerationSession {
    client: RwLock<Arc<GenerationClient>>,
    state: Arc<watch::Sender<SessionSnapshot>>,
}

impl std::fmt::Debug for GenerationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationSession")
            .field("snapshot", &*self.state.borrow())
            .finish()
    }
}

impl GenerationSession {
    pub fn new(client: GenerationClient) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot {
            generation: 0,
            state: SessionState::Idle,
            image: None,
        });
        Self {
            client: RwLock::new(Arc::new(client)),
            state: Arc::new(tx),
        }
    }

    /// Current state and generation.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().state.clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Stream of snapshots, starting with the current one.
    pub fn updates(&self) -> WatchStream<SessionSnapshot> {
        WatchStream::new(self.state.subscribe())
    }

    /// Wait until the session is no longer preparing or awaiting a response.
    pub async fn settled(&self) -> SessionSnapshot {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|snap| !snap.state.is_in_flight()).await {
            Ok(snap) => snap.clone(),
            // The sender lives in `self`, so it cannot be gone while we borrow it.
            Err(_) => self.snapshot(),
        };
        settled
    }

    /// Select a screenshot and start generating code for it.
    ///
    /// Any earlier pipeline is abandoned. Selecting the same image again
    /// while its pipeline is still running is ignored and returns `None`.
    pub fn select_image(&self, image: SourceImage) -> Option<PipelineHandle> {
        let mut generation = 0;
        let started = self.state.send_if_modified(|snap| {
            let duplicate = snap.state.is_in_flight()
                && snap.image.as_ref().is_some_and(|cur| cur.same_source(&image));
            if duplicate {
                return false;
            }
            snap.generation += 1;
            snap.state = SessionState::Preparing;
            snap.image = Some(image.clone());
            generation = snap.generation;
            true
        });

        if !started {
            debug!("Ignoring re-selection of the in-flight image");
            return None;
        }
        info!(
            "Generation {}: selected {} ({} bytes)",
            generation,
            image.name().unwrap_or("<unnamed>"),
            image.len()
        );
        Some(self.spawn_pipeline(generation, image))
    }

    /// Start a fresh attempt for the current image.
    ///
    /// Only acts from a terminal state; returns `None` when idle or busy.
    pub fn retry(&self) -> Option<PipelineHandle> {
        let mut restarted = None;
        self.state.send_if_modified(|snap| {
            if !snap.state.is_terminal() {
                return false;
            }
            let Some(image) = snap.image.clone() else {
                return false;
            };
            snap.generation += 1;
            snap.state = SessionState::Preparing;
            restarted = Some((snap.generation, image));
            true
        });
        let (generation, image) = restarted?;
        info!("Generation {}: retry requested", generation);
        Some(self.spawn_pipeline(generation, image))
    }

    /// Replace the credential. When an image is selected, generation restarts
    /// for it with the new credential.
    ///
    /// Unlike [`Self::retry`], this restarts from any state: a pipeline still
    /// in flight is superseded and its result discarded when it arrives.
    pub fn set_credential(&self, credential: Option<Credential>) -> Option<PipelineHandle> {
        {
            let mut guard = self.client.write().unwrap_or_else(|e| e.into_inner());
            let updated = guard.with_credential(credential);
            *guard = Arc::new(updated);
        }

        let mut restarted = None;
        self.state.send_if_modified(|snap| {
            let Some(image) = snap.image.clone() else {
                return false;
            };
            snap.generation += 1;
            snap.state = SessionState::Preparing;
            restarted = Some((snap.generation, image));
            true
        });
        let (generation, image) = restarted?;
        info!("Generation {}: credential changed, regenerating", generation);
        Some(self.spawn_pipeline(generation, image))
    }

    /// Drop the selected image and any in-flight result; back to `Idle`.
    pub fn reset(&self) {
        self.state.send_modify(|snap| {
            snap.generation += 1;
            snap.state = SessionState::Idle;
            snap.image = None;
        });
        debug!("Session reset");
    }

    fn current_client(&self) -> Arc<GenerationClient> {
        let guard = self.client.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    fn spawn_pipeline(&self, generation: u64, image: SourceImage) -> PipelineHandle {
        let client = self.current_client();
        let state = Arc::clone(&self.state);
        let task = tokio::spawn(run_pipeline(client, state, generation, image));
        PipelineHandle { generation, task }
    }
}

/// prepare → send → resolve, writing state only while `generation` is current.
async fn run_pipeline(
    client: Arc<GenerationClient>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    generation: u64,
    image: SourceImage,
) {
    let prepared = match prepare_async(client.preparer(), image).await {
        Ok(p) => p,
        Err(e) => {
            warn!("Generation {}: preparation failed: {}", generation, e);
            transition(&state, generation, SessionState::Failed(e.into()));
            return;
        }
    };

    if !transition(&state, generation, SessionState::AwaitingResponse) {
        return;
    }

    let result = client.generate(&prepared).await;
    transition(&state, generation, SessionState::from_result(result));
}

/// Apply `next` if `generation` is still current. Returns whether it was applied.
fn transition(state: &watch::Sender<SessionSnapshot>, generation: u64, next: SessionState) -> bool {
    let applied = state.send_if_modified(|snap| {
        if snap.generation != generation {
            return false;
        }
        snap.state = next;
        true
    });
    if !applied {
        debug!("Generation {}: result discarded, session moved on", generation);
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;

    fn idle_session() -> GenerationSession {
        let config = GenerationConfig::builder().api_key("sk-test").build().unwrap();
        GenerationSession::new(GenerationClient::new(config).unwrap())
    }

    #[test]
    fn starts_idle() {
        let s = idle_session();
        let snap = s.snapshot();
        assert_eq!(snap.generation, 0);
        assert_eq!(snap.state, SessionState::Idle);
        assert!(snap.image().is_none());
    }

    #[test]
    fn retry_from_idle_does_nothing() {
        let s = idle_session();
        assert!(s.retry().is_none());
        assert_eq!(s.snapshot().generation, 0);
    }

    #[test]
    fn reset_bumps_generation() {
        let s = idle_session();
        s.reset();
        s.reset();
        assert_eq!(s.snapshot().generation, 2);
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn stale_transition_is_rejected() {
        let (tx, _rx) = watch::channel(SessionSnapshot {
            generation: 3,
            state: SessionState::Preparing,
            image: None,
        });
        assert!(!transition(&tx, 2, SessionState::AwaitingResponse));
        assert_eq!(tx.borrow().state, SessionState::Preparing);
        assert!(transition(&tx, 3, SessionState::AwaitingResponse));
        assert_eq!(tx.borrow().state, SessionState::AwaitingResponse);
    }

    #[test]
    fn state_predicates() {
        assert!(SessionState::Preparing.is_in_flight());
        assert!(SessionState::AwaitingResponse.is_in_flight());
        assert!(!SessionState::Idle.is_in_flight());
        assert!(!SessionState::Idle.is_terminal());
        let failed = SessionState::Failed(GenerationFailure {
            kind: crate::error::FailureKind::Decode,
            message: "x".into(),
        });
        assert!(failed.is_terminal());
    }

    #[test]
    fn set_credential_without_image_only_swaps_client() {
        let s = idle_session();
        assert!(s.set_credential(None).is_none());
        assert!(s.current_client().config().usable_credential().is_none());
        assert_eq!(s.snapshot().generation, 0);
    }
}
