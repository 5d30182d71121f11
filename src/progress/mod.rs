//! Progress observation for verification tasks.
//!
//! A [`ProgressTransport`] turns a task id into a stream of
//! [`ProgressSnapshot`]s. Two implementations exist and are selected by
//! configuration through [`build_transport`]:
//!
//! - [`PollingTransport`]: `GET /progress/{task_id}` on a fixed cadence
//! - [`StreamingTransport`]: server-sent events from `/progress/stream/{task_id}`
//!
//! The [`ProgressObserver`] drives one transport per task handle, detects the
//! terminal snapshot, tears the transport down and fires the task's
//! [`CompletionSignal`] after a settle delay.

pub mod completion;
pub mod observer;
pub mod polling;
pub mod streaming;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::VerificationApi;
use crate::errors::ProgressTransportError;
use crate::normalize::{as_count, as_f64};

pub use completion::{CompletionReceiver, CompletionSignal, SettleDelays, TaskOutcome, completion_channel};
pub use observer::{Observation, ObservationUpdate, ObserverEvent, ObserverState, ProgressObserver};
pub use polling::PollingTransport;
pub use streaming::StreamingTransport;

/// Default cadence for the polling transport.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Highest percentage shown for a task that has not reported `completed`.
const MAX_UNFINISHED_PERCENTAGE: f64 = 99.0;

/// Lifecycle status reported by the service for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Error,
}

impl ProgressStatus {
    /// Parse a service status string; unknown values are treated as `Pending`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "processing" => ProgressStatus::Processing,
            "completed" => ProgressStatus::Completed,
            "error" => ProgressStatus::Error,
            _ => ProgressStatus::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ProgressStatus::Completed | ProgressStatus::Error)
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressStatus::Pending => write!(f, "pending"),
            ProgressStatus::Processing => write!(f, "processing"),
            ProgressStatus::Completed => write!(f, "completed"),
            ProgressStatus::Error => write!(f, "error"),
        }
    }
}

/// One progress update for a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub completed: u64,
    pub total: u64,
    pub current: String,
    pub status: ProgressStatus,
    /// As reported, clamped into `[0, 100]`. Not smoothed: a value lower than
    /// the previous snapshot's is passed through.
    pub percentage: f64,
}

impl ProgressSnapshot {
    /// Parse a progress payload. Missing fields are defaulted; only a
    /// non-object payload is rejected.
    pub fn from_value(value: &Value) -> Result<Self, ProgressTransportError> {
        let obj = value.as_object().ok_or_else(|| {
            ProgressTransportError::Decode(format!("expected a JSON object, got {}", value))
        })?;

        let completed = obj.get("completed").and_then(as_count).unwrap_or(0);
        let total = obj.get("total").and_then(as_count).unwrap_or(0);
        let percentage = obj
            .get("percentage")
            .and_then(as_f64)
            .unwrap_or_else(|| {
                if total > 0 {
                    completed as f64 / total as f64 * 100.0
                } else {
                    0.0
                }
            })
            .clamp(0.0, 100.0);

        Ok(Self {
            completed,
            total,
            current: obj
                .get("current")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            status: obj
                .get("status")
                .and_then(Value::as_str)
                .map(ProgressStatus::parse)
                .unwrap_or_default(),
            percentage,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The outcome this snapshot ends the task with, if it is terminal.
    pub fn terminal_outcome(&self) -> Option<TaskOutcome> {
        match self.status {
            ProgressStatus::Completed => Some(TaskOutcome::Completed),
            ProgressStatus::Error => Some(TaskOutcome::Error),
            ProgressStatus::Pending | ProgressStatus::Processing => None,
        }
    }

    /// Percentage to display: never 100 before the task reports `completed`.
    pub fn display_percentage(&self) -> f64 {
        if self.status == ProgressStatus::Completed {
            self.percentage
        } else {
            self.percentage.min(MAX_UNFINISHED_PERCENTAGE)
        }
    }
}

/// Stream of snapshots for one task. Polling never yields `Err`; streaming
/// yields one `Err` when the connection fails and then ends.
pub type SnapshotStream = BoxStream<'static, Result<ProgressSnapshot, ProgressTransportError>>;

/// A strategy for observing a task's progress.
#[async_trait]
pub trait ProgressTransport: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Start observing `task_id`. Dropping the returned stream tears the
    /// transport down (stops the timer or closes the connection).
    async fn open(&self, task_id: &str) -> Result<SnapshotStream, ProgressTransportError>;
}

/// Which progress transport to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Interval polling of the progress endpoint
    #[default]
    Poll,
    /// Server-sent event stream
    Stream,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Poll => write!(f, "poll"),
            TransportKind::Stream => write!(f, "stream"),
        }
    }
}

impl std::str::FromStr for TransportKind {
    type Err = crate::errors::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "poll" | "polling" => Ok(TransportKind::Poll),
            "stream" | "streaming" | "sse" => Ok(TransportKind::Stream),
            _ => Err(crate::errors::ConfigError::InvalidTransport(s.to_string())),
        }
    }
}

/// Build the configured transport over `api`.
pub fn build_transport(
    kind: TransportKind,
    api: Arc<dyn VerificationApi>,
    poll_interval: Duration,
) -> Arc<dyn ProgressTransport> {
    match kind {
        TransportKind::Poll => Arc::new(PollingTransport::new(api, poll_interval)),
        TransportKind::Stream => Arc::new(StreamingTransport::new(api)),
    }
}
