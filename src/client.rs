//! HTTP client for the verification service.
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Method | Path                          | Body                     |
//! |--------|-------------------------------|--------------------------|
//! | POST   | `/verify/text`                | JSON `{"text": ...}`     |
//! | POST   | `/verify/url`                 | JSON `{"url": ...}`      |
//! | POST   | `/verify/file`                | multipart, field `file`  |
//! | GET    | `/progress/{task_id}`         |                          |
//! | GET    | `/progress/stream/{task_id}`  | `text/event-stream`      |

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tracing::debug;

use crate::config::ApiBaseUrl;
use crate::errors::{HttpStatus, ProgressTransportError, SubmissionError};
use crate::normalize::is_empty_payload;
use crate::request::VerificationRequest;
use crate::stream::SseDecoder;

/// Raw `data` payloads of a progress event stream. Ends after a transport
/// error or when the server closes the connection.
pub type ProgressEventStream = BoxStream<'static, Result<String, ProgressTransportError>>;

/// The verification service as seen by the coordinator and transports.
#[async_trait]
pub trait VerificationApi: Send + Sync {
    /// Submit content. Returns the raw, non-empty JSON payload.
    async fn submit(&self, request: &VerificationRequest) -> Result<Value, SubmissionError>;

    /// Fetch one progress snapshot payload.
    async fn fetch_progress(&self, task_id: &str) -> Result<Value, ProgressTransportError>;

    /// Open the server-sent progress stream for a task.
    async fn subscribe_progress(
        &self,
        task_id: &str,
    ) -> Result<ProgressEventStream, ProgressTransportError>;
}

/// `reqwest`-backed [`VerificationApi`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: ApiBaseUrl,
    timeout: Duration,
}

impl HttpClient {
    /// `timeout` bounds submissions and progress polls. The event stream is
    /// long-lived and only bounded by the connect timeout.
    pub fn new(base_url: ApiBaseUrl, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("claimcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Progress URL for `task_id`. The id is pushed as a single escaped path
    /// segment, so `/`, `?` and `#` stay part of the id.
    fn progress_url(&self, prefix: &[&str], task_id: &str) -> Result<Url, ProgressTransportError> {
        let mut url = Url::parse(self.base_url.as_str())
            .map_err(|e| ProgressTransportError::Request(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| {
                ProgressTransportError::Request(format!("{} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(prefix)
            .push(task_id);
        Ok(url)
    }

    fn build_submission(
        &self,
        request: &VerificationRequest,
    ) -> Result<reqwest::RequestBuilder, SubmissionError> {
        let url = self.endpoint(&format!("verify/{}", request.kind().path()));
        let builder = self.http.post(url).timeout(self.timeout);
        let builder = match request {
            VerificationRequest::Text { text } => builder.json(&json!({ "text": text })),
            VerificationRequest::Url { url } => builder.json(&json!({ "url": url })),
            VerificationRequest::File {
                bytes,
                filename,
                mime_type,
            } => {
                let part = Part::bytes(bytes.clone())
                    .file_name(filename.clone())
                    .mime_str(mime_type)
                    .map_err(|e| transport_error(None, e.to_string()))?;
                builder.multipart(Form::new().part("file", part))
            }
        };
        Ok(builder)
    }
}

fn transport_error(status: Option<u16>, body: String) -> SubmissionError {
    SubmissionError::Transport {
        status: HttpStatus(status),
        body,
    }
}

#[async_trait]
impl VerificationApi for HttpClient {
    async fn submit(&self, request: &VerificationRequest) -> Result<Value, SubmissionError> {
        let builder = self.build_submission(request)?;
        debug!(kind = request.kind().path(), "POST verification request");

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(transport_error(Some(status.as_u16()), body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(Some(status.as_u16()), e.to_string()))?;
        let payload: Value =
            serde_json::from_str(&body).map_err(|_| SubmissionError::MalformedResponse)?;
        if is_empty_payload(&payload) {
            return Err(SubmissionError::MalformedResponse);
        }
        Ok(payload)
    }

    async fn fetch_progress(&self, task_id: &str) -> Result<Value, ProgressTransportError> {
        let response = self
            .http
            .get(self.progress_url(&["progress"], task_id)?)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProgressTransportError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProgressTransportError::Status {
                status: response.status().as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProgressTransportError::Decode(e.to_string()))
    }

    async fn subscribe_progress(
        &self,
        task_id: &str,
    ) -> Result<ProgressEventStream, ProgressTransportError> {
        let response = self
            .http
            .get(self.progress_url(&["progress", "stream"], task_id)?)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| ProgressTransportError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProgressTransportError::Status {
                status: response.status().as_u16(),
            });
        }

        let mut decoder = SseDecoder::new();
        let events = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder
                    .feed(&bytes)
                    .into_iter()
                    .map(|event| Ok(event.data))
                    .collect::<Vec<_>>(),
                Err(e) => vec![Err(ProgressTransportError::Request(e.to_string()))],
            })
            .flat_map(stream::iter);

        Ok(events.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpClient {
        HttpClient::new(ApiBaseUrl::parse(base).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_progress_url_escapes_task_id() {
        let url = client("http://127.0.0.1:8000")
            .progress_url(&["progress"], "job?7#a")
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/progress/job%3F7%23a");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_progress_url_keeps_base_path() {
        let url = client("https://api.example.com/v1/")
            .progress_url(&["progress", "stream"], "a/b")
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/progress/stream/a%2Fb");
    }
}
