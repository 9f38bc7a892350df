//! Request lifecycle.
//!
//! [`LifecycleController`] is the single owner of [`LifecycleState`]. Every
//! non-empty [`LifecycleController::submit`] moves the state to `Pending`
//! (dropping the previous result), calls the generation provider once and
//! settles in `Success` or `Error`.
//!
//! Submissions may overlap. Each one takes a [`RequestId`] when it starts and
//! only the most recently issued request is allowed to settle the state, so
//! the final state always reflects the last submit regardless of the order in
//! which replies arrive. Nothing cancels the superseded calls; their replies
//! are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error};

use crate::interpret::{self, Block};
use crate::providers::GenerationProvider;

mod request_id;

pub use request_id::RequestId;
use request_id::LatestOnly;

/// User-facing message for any generation failure.
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to get a response.";

/// Where the current request stands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// A request is in flight.
    Pending,
    /// The latest request succeeded.
    Success { blocks: Vec<Block> },
    /// The latest request failed; `message` is safe to show.
    Error { message: String },
}

impl LifecycleState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// True for `Success` and `Error`.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Success { .. } | Self::Error { .. })
    }

    pub fn blocks(&self) -> Option<&[Block]> {
        match self {
            Self::Success { blocks } => Some(blocks),
            _ => None,
        }
    }
}

/// What happened to one `submit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The prompt was blank; nothing changed.
    Ignored,
    /// The reply (or failure) became the current state.
    Applied(RequestId),
    /// A newer submit started first; this reply was dropped.
    Superseded(RequestId),
}

/// The surface the prompt was typed into.
///
/// Cleared by the controller once a submission settles.
pub trait InputSurface: Send + Sync {
    fn clear(&self);
}

/// Drives prompts through the lifecycle against one provider.
pub struct LifecycleController<P> {
    provider: P,
    state: watch::Sender<LifecycleState>,
    requests: Mutex<LatestOnly>,
    input: Option<Arc<dyn InputSurface>>,
}

impl<P: GenerationProvider> LifecycleController<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            state: watch::Sender::new(LifecycleState::Idle),
            requests: Mutex::new(LatestOnly::default()),
            input: None,
        }
    }

    /// Attaches the input surface to clear after each settled submission.
    #[must_use]
    pub fn with_input(mut self, input: Arc<dyn InputSurface>) -> Self {
        self.input = Some(input);
        self
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> LifecycleState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Submits `prompt` and waits for it to settle.
    ///
    /// A blank prompt is ignored without touching the state or the provider.
    /// Failures never escape: they end in [`LifecycleState::Error`] with
    /// [`GENERATION_FAILED_MESSAGE`] while the cause goes to the log.
    pub async fn submit(&self, prompt: &str) -> Submission {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Submission::Ignored;
        }

        let req = self.begin();
        let result = self.provider.generate(prompt).await;

        if let Some(input) = &self.input {
            input.clear();
        }

        let next = match result {
            Ok(text) => LifecycleState::Success {
                blocks: interpret::parse(&text),
            },
            Err(err) => {
                error!(request = %req, "generation failed: {err:#}");
                LifecycleState::Error {
                    message: GENERATION_FAILED_MESSAGE.to_string(),
                }
            }
        };

        if self.settle(req, next) {
            Submission::Applied(req)
        } else {
            debug!(request = %req, "dropping reply of superseded request");
            Submission::Superseded(req)
        }
    }

    fn begin(&self) -> RequestId {
        let mut requests = self.lock_requests();
        let req = requests.begin();
        self.state.send_replace(LifecycleState::Pending);
        debug!(request = %req, "request pending");
        req
    }

    fn settle(&self, req: RequestId, next: LifecycleState) -> bool {
        let mut requests = self.lock_requests();
        if !requests.finish_if_active(req) {
            return false;
        }
        debug!(
            request = %req,
            success = matches!(next, LifecycleState::Success { .. }),
            "request settled"
        );
        self.state.send_replace(next);
        true
    }

    fn lock_requests(&self) -> MutexGuard<'_, LatestOnly> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
