//! Interval polling of `GET /progress/{task_id}`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use tokio::time::MissedTickBehavior;
use tracing::{trace, warn};

use super::{ProgressSnapshot, ProgressTransport, SnapshotStream};
use crate::client::VerificationApi;
use crate::errors::ProgressTransportError;

/// Queries once immediately, then once per interval. A failed query is
/// logged and skipped; the next tick tries again. At most one query is in
/// flight per task.
pub struct PollingTransport {
    api: Arc<dyn VerificationApi>,
    interval: Duration,
}

impl PollingTransport {
    pub fn new(api: Arc<dyn VerificationApi>, interval: Duration) -> Self {
        Self {
            api,
            interval: interval.max(Duration::from_millis(1)),
        }
    }
}

#[async_trait]
impl ProgressTransport for PollingTransport {
    fn name(&self) -> &'static str {
        "poll"
    }

    async fn open(&self, task_id: &str) -> Result<SnapshotStream, ProgressTransportError> {
        // The first tick completes immediately, giving the eager query.
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let state = (self.api.clone(), task_id.to_string(), ticker);
        let snapshots = stream::unfold(state, |(api, task_id, mut ticker)| async move {
            loop {
                ticker.tick().await;
                let snapshot = match api.fetch_progress(&task_id).await {
                    Ok(value) => ProgressSnapshot::from_value(&value),
                    Err(e) => Err(e),
                };
                match snapshot {
                    Ok(snapshot) => {
                        trace!(task_id = %task_id, status = %snapshot.status, "progress polled");
                        return Some((Ok(snapshot), (api, task_id, ticker)));
                    }
                    Err(e) => warn!(task_id = %task_id, error = %e, "progress poll failed"),
                }
            }
        });

        Ok(snapshots.boxed())
    }
}
