//! One-shot completion signal for a tracked task.
//!
//! [`CompletionSignal::fire`] consumes the signal, so it can fire at most
//! once per task handle. Dropping an unfired signal (cancellation,
//! supersession) resolves the receiver to `None`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// How a tracked task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOutcome {
    Completed,
    Error,
    /// The progress stream failed; no further progress will be observed.
    Disconnected,
}

/// Delays between observing a terminal state and firing the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    pub completed: Duration,
    pub error: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            completed: Duration::from_millis(2500),
            error: Duration::from_millis(1000),
        }
    }
}

impl SettleDelays {
    pub fn for_outcome(&self, outcome: TaskOutcome) -> Duration {
        match outcome {
            TaskOutcome::Completed => self.completed,
            TaskOutcome::Error => self.error,
            TaskOutcome::Disconnected => Duration::ZERO,
        }
    }
}

/// Sending half. Held by the observer task.
#[derive(Debug)]
pub struct CompletionSignal {
    tx: oneshot::Sender<TaskOutcome>,
}

/// Receiving half. Resolves to the outcome, or `None` if the signal was
/// dropped without firing.
#[derive(Debug)]
pub struct CompletionReceiver {
    rx: oneshot::Receiver<TaskOutcome>,
}

pub fn completion_channel() -> (CompletionSignal, CompletionReceiver) {
    let (tx, rx) = oneshot::channel();
    (CompletionSignal { tx }, CompletionReceiver { rx })
}

impl CompletionSignal {
    /// Fire now. Returns `false` if nobody is listening any more.
    pub fn fire(self, outcome: TaskOutcome) -> bool {
        self.tx.send(outcome).is_ok()
    }

    /// Fire after the settle delay for `outcome`, unless `cancel` trips first.
    pub async fn fire_after(
        self,
        outcome: TaskOutcome,
        delays: SettleDelays,
        cancel: &CancellationToken,
    ) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delays.for_outcome(outcome)) => self.fire(outcome),
        }
    }
}

impl Future for CompletionReceiver {
    type Output = Option<TaskOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}
