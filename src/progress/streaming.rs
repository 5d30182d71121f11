//! Server-sent progress events from `/progress/stream/{task_id}`.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde_json::Value;
use tracing::warn;

use super::{ProgressSnapshot, ProgressTransport, SnapshotStream};
use crate::client::VerificationApi;
use crate::errors::ProgressTransportError;

/// Each event's `data` is one snapshot. Undecodable events are logged and
/// skipped. A transport failure, or the server closing the stream, ends
/// observation with a single `Err`.
pub struct StreamingTransport {
    api: Arc<dyn VerificationApi>,
}

impl StreamingTransport {
    pub fn new(api: Arc<dyn VerificationApi>) -> Self {
        Self { api }
    }
}

fn decode(data: &str) -> Result<ProgressSnapshot, ProgressTransportError> {
    let value: Value =
        serde_json::from_str(data).map_err(|e| ProgressTransportError::Decode(e.to_string()))?;
    ProgressSnapshot::from_value(&value)
}

#[async_trait]
impl ProgressTransport for StreamingTransport {
    fn name(&self) -> &'static str {
        "stream"
    }

    async fn open(&self, task_id: &str) -> Result<SnapshotStream, ProgressTransportError> {
        let events = self.api.subscribe_progress(task_id).await?;
        let task_id = task_id.to_string();

        let snapshots = events
            .filter_map(move |item| {
                let result = match item {
                    Ok(data) => match decode(&data) {
                        Ok(snapshot) => Some(Ok(snapshot)),
                        Err(e) => {
                            warn!(task_id = %task_id, error = %e, "skipping malformed progress event");
                            None
                        }
                    },
                    Err(e) => Some(Err(e)),
                };
                futures::future::ready(result)
            })
            .chain(stream::once(futures::future::ready(Err(
                ProgressTransportError::StreamClosed,
            ))));

        Ok(snapshots.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_event() {
        let snap = decode(r#"{"status":"completed","percentage":100}"#).unwrap();
        assert!(snap.is_terminal());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("not json"), Err(ProgressTransportError::Decode(_))));
        assert!(matches!(decode("42"), Err(ProgressTransportError::Decode(_))));
    }
}
