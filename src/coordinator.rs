//! Submission coordinator: the single owner of session state.
//!
//! Every submission gets a sequence number. Starting a new submission (or
//! cancelling) bumps it, tears down the previous observation, and makes
//! any late response from the older submission a no-op. State is published
//! through a [`watch`] channel; the presentation layer only reads it.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::VerificationApi;
use crate::errors::SubmissionError;
use crate::normalize::normalize;
use crate::progress::{
    Observation, ObservationUpdate, ObserverEvent, ProgressObserver, ProgressSnapshot, TaskOutcome,
};
use crate::request::VerificationRequest;
use crate::result::VerificationResult;
use crate::task::{self, TaskHandle};

/// Message shown before the kind-specific placeholder.
pub const INITIAL_MESSAGE: &str = "Initializing...";

/// What the progress area shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProgressView {
    /// Local placeholder while the submission is in flight.
    Placeholder { percentage: f64, message: String },
    /// Latest snapshot reported for the tracked task.
    Live(ProgressSnapshot),
}

impl ProgressView {
    pub fn percentage(&self) -> f64 {
        match self {
            ProgressView::Placeholder { percentage, .. } => *percentage,
            ProgressView::Live(snapshot) => snapshot.display_percentage(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ProgressView::Placeholder { message, .. } => message,
            ProgressView::Live(snapshot) if snapshot.current.trim().is_empty() => "Processing...",
            ProgressView::Live(snapshot) => &snapshot.current,
        }
    }
}

/// Observable session state.
///
/// `loading` is true from submission start until the completion signal
/// fires, the submission fails, or the session is cancelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionState {
    pub seq: u64,
    pub loading: bool,
    pub progress: Option<ProgressView>,
    pub task: Option<TaskHandle>,
    pub result: Option<Arc<VerificationResult>>,
    /// User-visible error from the last submission.
    pub error: Option<String>,
    pub celebrating: bool,
    /// How the last tracked task ended.
    pub outcome: Option<TaskOutcome>,
}

pub struct SubmissionCoordinator {
    api: Arc<dyn VerificationApi>,
    observer: ProgressObserver,
    state: Arc<watch::Sender<SessionState>>,
    /// Cancel token of the live observation, tagged with its sequence.
    active: Mutex<Option<(u64, CancellationToken)>>,
}

impl SubmissionCoordinator {
    pub fn new(api: Arc<dyn VerificationApi>, observer: ProgressObserver) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            api,
            observer,
            state: Arc::new(state),
            active: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Whether the submit action is available for `request`.
    pub fn can_submit(&self, request: Option<&VerificationRequest>) -> bool {
        !self.state.borrow().loading && crate::request::can_submit(request)
    }

    /// Submit `request`, superseding any submission in progress.
    ///
    /// Returns the normalized result as soon as the service answers; task
    /// progress keeps being tracked in the background until the completion
    /// signal fires. A validation failure changes no state and makes no
    /// request.
    pub async fn submit(
        &self,
        request: VerificationRequest,
    ) -> Result<Arc<VerificationResult>, SubmissionError> {
        let request = request.validate()?;
        let kind = request.kind();
        let fallback = TaskHandle::local();

        let seq = self.begin();
        self.apply(seq, |s| {
            s.loading = true;
            s.progress = Some(ProgressView::Placeholder {
                percentage: 0.0,
                message: INITIAL_MESSAGE.to_string(),
            });
        });
        let (percentage, message) = kind.placeholder();
        self.apply(seq, |s| {
            s.progress = Some(ProgressView::Placeholder {
                percentage,
                message: message.to_string(),
            });
        });
        info!(seq, kind = kind.path(), "submitting verification request");

        let response = self.api.submit(&request).await;
        if !self.is_current(seq) {
            debug!(seq, "discarding response of superseded submission");
            return Err(SubmissionError::Superseded { seq });
        }

        let payload = match response {
            Ok(payload) => payload,
            Err(err) => {
                warn!(seq, error = %err, "submission failed");
                let message = err.to_string();
                self.apply(seq, |s| {
                    s.error = Some(message);
                    s.loading = false;
                    s.progress = None;
                    s.task = None;
                });
                return Err(err);
            }
        };

        let handle = task::resolve_or(&payload, fallback);
        let result = Arc::new(normalize(&payload));
        info!(
            seq,
            task_id = %handle,
            server_issued = handle.is_server_issued(),
            claims = result.total_claims,
            "verification response received"
        );

        let observation = self.observer.observe(handle.clone());
        if !self.activate(seq, observation.cancellation_token()) {
            return Err(SubmissionError::Superseded { seq });
        }
        let published = result.clone();
        self.apply(seq, |s| {
            s.task = Some(handle);
            s.result = Some(published);
            s.progress = None;
        });

        tokio::spawn(drive(self.state.clone(), seq, observation));
        Ok(result)
    }

    /// Abandon the current submission. Never fires a completion signal.
    pub fn cancel(&self) {
        let seq = self.begin();
        info!(seq, "verification cancelled");
    }

    /// Wait until no submission is loading.
    pub async fn wait_idle(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|s| !s.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Supersede whatever is in flight and return the new sequence number.
    fn begin(&self) -> u64 {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((old, token)) = active.take() {
            debug!(seq = old, "tearing down previous observation");
            token.cancel();
        }
        let mut seq = 0;
        self.state.send_modify(|s| {
            s.seq += 1;
            seq = s.seq;
            s.loading = false;
            s.progress = None;
            s.task = None;
            s.result = None;
            s.error = None;
            s.celebrating = false;
            s.outcome = None;
        });
        seq
    }

    /// Record `token` as the live observation if `seq` is still current.
    fn activate(&self, seq: u64, token: CancellationToken) -> bool {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(seq) {
            token.cancel();
            return false;
        }
        *active = Some((seq, token));
        true
    }

    fn is_current(&self, seq: u64) -> bool {
        self.state.borrow().seq == seq
    }

    fn apply(&self, seq: u64, f: impl FnOnce(&mut SessionState)) -> bool {
        apply(&self.state, seq, f)
    }
}

/// Mutate state only while `seq` is still the current submission.
fn apply(state: &watch::Sender<SessionState>, seq: u64, f: impl FnOnce(&mut SessionState)) -> bool {
    state.send_if_modified(|s| {
        if s.seq != seq {
            return false;
        }
        f(s);
        true
    })
}

async fn drive(state: Arc<watch::Sender<SessionState>>, seq: u64, mut observation: Observation) {
    while let Some(update) = observation.next().await {
        let applied = match update {
            ObservationUpdate::Event(ObserverEvent::Snapshot(snapshot)) => {
                apply(&state, seq, |s| s.progress = Some(ProgressView::Live(snapshot)))
            }
            ObservationUpdate::Event(ObserverEvent::Celebrate) => {
                apply(&state, seq, |s| s.celebrating = true)
            }
            ObservationUpdate::Finished(outcome) => {
                debug!(seq, outcome = ?outcome, "completion signal fired");
                apply(&state, seq, |s| {
                    s.loading = false;
                    s.task = None;
                    s.progress = None;
                    s.celebrating = false;
                    s.outcome = Some(outcome);
                })
            }
        };
        if !applied {
            break;
        }
    }
}
