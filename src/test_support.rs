//! Scripted [`VerificationApi`] double shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use serde_json::{Value, json};

use crate::client::{ProgressEventStream, VerificationApi};
use crate::errors::{ProgressTransportError, SubmissionError};
use crate::request::VerificationRequest;

#[derive(Default)]
pub struct FakeApi {
    submissions: Mutex<VecDeque<(Duration, Result<Value, SubmissionError>)>>,
    progress: Mutex<VecDeque<Result<Value, ProgressTransportError>>>,
    stream_events: Mutex<Option<Vec<Result<String, ProgressTransportError>>>>,
    pub submit_calls: AtomicUsize,
    pub progress_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a submission response returned after `delay`.
    pub fn respond(self, delay: Duration, response: Result<Value, SubmissionError>) -> Self {
        self.submissions
            .lock()
            .unwrap()
            .push_back((delay, response));
        self
    }

    /// Queue progress responses; the last one repeats forever.
    pub fn progress(self, responses: Vec<Result<Value, ProgressTransportError>>) -> Self {
        self.progress.lock().unwrap().extend(responses);
        self
    }

    pub fn stream(self, events: Vec<Result<String, ProgressTransportError>>) -> Self {
        *self.stream_events.lock().unwrap() = Some(events);
        self
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.progress_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationApi for FakeApi {
    async fn submit(&self, _request: &VerificationRequest) -> Result<Value, SubmissionError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.submissions.lock().unwrap().pop_front();
        match next {
            Some((delay, response)) => {
                tokio::time::sleep(delay).await;
                response
            }
            None => Err(SubmissionError::MalformedResponse),
        }
    }

    async fn fetch_progress(&self, _task_id: &str) -> Result<Value, ProgressTransportError> {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.progress.lock().unwrap();
        match queue.len() {
            0 => Ok(json!({"status": "pending", "current": "Initializing..."})),
            1 => queue[0].clone(),
            _ => queue.pop_front().unwrap(),
        }
    }

    async fn subscribe_progress(
        &self,
        _task_id: &str,
    ) -> Result<ProgressEventStream, ProgressTransportError> {
        match self.stream_events.lock().unwrap().take() {
            Some(events) => Ok(stream::iter(events).boxed()),
            None => Err(ProgressTransportError::Request("connection refused".into())),
        }
    }
}

pub fn snapshot(status: &str, percentage: f64) -> Value {
    json!({
        "completed": 0,
        "total": 0,
        "current": format!("{} {}", status, percentage),
        "status": status,
        "percentage": percentage,
    })
}
