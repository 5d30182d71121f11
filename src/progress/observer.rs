//! Per-handle progress observation.
//!
//! [`ProgressObserver::observe`] spawns one task per [`TaskHandle`]. The task
//! forwards snapshots until the first terminal one, tears the transport
//! down, then fires the handle's completion signal after the settle delay.
//! Cancelling (or dropping) the [`Observation`] stops the transport and
//! suppresses the signal.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::completion::{CompletionReceiver, CompletionSignal, SettleDelays, TaskOutcome, completion_channel};
use super::{ProgressSnapshot, ProgressTransport};
use crate::task::TaskHandle;

/// Something the presentation layer should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    Snapshot(ProgressSnapshot),
    /// The task completed successfully; show the celebration until the
    /// completion signal fires.
    Celebrate,
}

/// Lifecycle of one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Idle,
    Tracking,
    /// Terminal state observed; transport torn down, signal pending.
    Settling(TaskOutcome),
    Finished(TaskOutcome),
    Cancelled,
}

/// Item yielded by [`Observation::next`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationUpdate {
    Event(ObserverEvent),
    Finished(TaskOutcome),
}

pub struct ProgressObserver {
    transport: Arc<dyn ProgressTransport>,
    delays: SettleDelays,
}

impl ProgressObserver {
    pub fn new(transport: Arc<dyn ProgressTransport>, delays: SettleDelays) -> Self {
        Self { transport, delays }
    }

    /// Start observing `handle`. Must be called inside a tokio runtime.
    pub fn observe(&self, handle: TaskHandle) -> Observation {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (signal, completion) = completion_channel();
        let (state_tx, state_rx) = watch::channel(ObserverState::Idle);
        let cancel = CancellationToken::new();

        tokio::spawn(run(
            self.transport.clone(),
            self.delays,
            handle,
            events_tx,
            signal,
            state_tx,
            cancel.clone(),
        ));

        Observation {
            events: events_rx,
            completion,
            finished: false,
            state: state_rx,
            cancel,
        }
    }
}

/// A running observation. Dropping it cancels the observation.
pub struct Observation {
    events: mpsc::UnboundedReceiver<ObserverEvent>,
    completion: CompletionReceiver,
    finished: bool,
    state: watch::Receiver<ObserverState>,
    cancel: CancellationToken,
}

impl Observation {
    pub fn state(&self) -> ObserverState {
        *self.state.borrow()
    }

    /// Token that cancels this observation when tripped.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Next event, or the completion outcome. Events emitted before the
    /// signal fired are always yielded first. Returns `None` after the
    /// outcome, or once the observation was cancelled.
    pub async fn next(&mut self) -> Option<ObservationUpdate> {
        if self.finished {
            return None;
        }
        tokio::select! {
            biased;
            Some(event) = self.events.recv() => Some(ObservationUpdate::Event(event)),
            outcome = &mut self.completion => {
                self.finished = true;
                outcome.map(ObservationUpdate::Finished)
            }
        }
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    transport: Arc<dyn ProgressTransport>,
    delays: SettleDelays,
    handle: TaskHandle,
    events: mpsc::UnboundedSender<ObserverEvent>,
    signal: CompletionSignal,
    state: watch::Sender<ObserverState>,
    cancel: CancellationToken,
) {
    let task_id = handle.id.as_str();
    let _ = state.send(ObserverState::Tracking);
    debug!(task_id, transport = transport.name(), "observing task progress");

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        opened = transport.open(task_id) => Some(opened),
    };

    let outcome = match opened {
        None => {
            let _ = state.send(ObserverState::Cancelled);
            return;
        }
        Some(Err(e)) => {
            warn!(task_id, error = %e, "could not open progress transport");
            TaskOutcome::Disconnected
        }
        Some(Ok(mut snapshots)) => {
            let outcome = loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(task_id, "progress observation cancelled");
                        let _ = state.send(ObserverState::Cancelled);
                        return;
                    }
                    next = snapshots.next() => next,
                };
                match next {
                    Some(Ok(snapshot)) => {
                        let terminal = snapshot.terminal_outcome();
                        let _ = events.send(ObserverEvent::Snapshot(snapshot));
                        if let Some(outcome) = terminal {
                            break outcome;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(task_id, error = %e, "progress stream failed");
                        break TaskOutcome::Disconnected;
                    }
                    None => break TaskOutcome::Disconnected,
                }
            };
            // Stops the poll timer or closes the event stream.
            drop(snapshots);
            outcome
        }
    };

    info!(task_id, outcome = ?outcome, "task reached terminal state");
    if outcome == TaskOutcome::Completed {
        let _ = events.send(ObserverEvent::Celebrate);
    }
    let _ = state.send(ObserverState::Settling(outcome));

    if signal.fire_after(outcome, delays, &cancel).await {
        let _ = state.send(ObserverState::Finished(outcome));
    } else {
        let _ = state.send(ObserverState::Cancelled);
    }
}
