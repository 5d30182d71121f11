//! Mock verification service for integration tests.
//!
//! Serves the same endpoints as the real service on `127.0.0.1:0`:
//! - text containing "fail" answers 500 `internal boom`
//! - text containing "empty" answers 200 with an empty body
//! - text containing "odd id" is issued the task id `job?7#a`
//! - `/verify/url` answers without a `task_id`
//! - `/progress/{id}` reports 40%, 80%, then completed
//! - `/progress/stream/{id}` sends two snapshots and one malformed event

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Default)]
pub struct MockState {
    pub submissions: AtomicUsize,
    pub polls: AtomicUsize,
    pub last_text: Mutex<Option<String>>,
    pub last_upload: Mutex<Option<String>>,
    pub polled_ids: Mutex<Vec<String>>,
}

pub struct MockService {
    pub url: String,
    pub state: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Drop for MockService {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub fn earth_payload(task_id: Option<&str>) -> Value {
    let mut payload = json!({
        "domain": "science",
        "total_claims": 1,
        "overall_reliability": 0.95,
        "claims": [{
            "claim": "The Earth orbits the Sun.",
            "status": "verified",
            "confidence": 0.97,
            "similarity": 0.91,
            "credibility": 0.95,
            "contradicted": false,
            "citations": [{"title": "NASA", "url": "https://nasa.gov"}],
            "explanation": "Confirmed by astronomical consensus."
        }]
    });
    if let Some(id) = task_id {
        payload["task_id"] = json!(id);
    }
    payload
}

fn snapshot(status: &str, percentage: f64) -> Value {
    json!({
        "completed": (percentage / 10.0) as u64,
        "total": 10,
        "current": format!("Verifying claims ({}%)", percentage),
        "status": status,
        "percentage": percentage,
    })
}

async fn verify_text(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.submissions.fetch_add(1, Ordering::SeqCst);
    let text = body
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    *state.last_text.lock().unwrap() = Some(text.clone());

    if text.contains("fail") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "internal boom").into_response();
    }
    if text.contains("empty") {
        return (StatusCode::OK, "").into_response();
    }
    if text.contains("odd id") {
        return Json(earth_payload(Some("job?7#a"))).into_response();
    }
    Json(earth_payload(Some("task-text"))).into_response()
}

async fn verify_url(State(state): State<Arc<MockState>>, Json(_body): Json<Value>) -> Json<Value> {
    state.submissions.fetch_add(1, Ordering::SeqCst);
    Json(earth_payload(None))
}

async fn verify_file(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Value> {
    state.submissions.fetch_add(1, Ordering::SeqCst);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    *state.last_upload.lock().unwrap() =
        Some(format!("{}\n{}", content_type, String::from_utf8_lossy(&body)));
    Json(json!({"task_id": "task-file", "domain": "documents", "claims": []}))
}

async fn progress(State(state): State<Arc<MockState>>, Path(task_id): Path<String>) -> Json<Value> {
    state.polled_ids.lock().unwrap().push(task_id);
    let n = state.polls.fetch_add(1, Ordering::SeqCst);
    Json(match n {
        0 => snapshot("processing", 40.0),
        1 => snapshot("processing", 80.0),
        _ => snapshot("completed", 100.0),
    })
}

async fn progress_stream(Path(_task_id): Path<String>) -> impl IntoResponse {
    let body = format!(
        ": connected\n\nevent: progress\ndata: {}\n\ndata: not-json\n\nevent: progress\ndata: {}\n\n",
        snapshot("processing", 50.0),
        snapshot("completed", 100.0),
    );
    ([(header::CONTENT_TYPE, "text/event-stream")], body)
}

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/verify/text", post(verify_text))
        .route("/verify/url", post(verify_url))
        .route("/verify/file", post(verify_file))
        .route("/progress/{task_id}", get(progress))
        .route("/progress/stream/{task_id}", get(progress_stream))
        .with_state(state)
}

/// Start the mock service, or `None` when the sandbox forbids binding.
pub async fn start() -> Option<MockService> {
    let listener = match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Skipping test (sandbox, cannot bind): {}", e);
            return None;
        }
    };
    let addr = listener.local_addr().ok()?;
    let state = Arc::new(MockState::default());
    let app = router(state.clone());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
        {
            eprintln!("Mock service error: {}", e);
        }
    });

    Some(MockService {
        url: format!("http://{}", addr),
        state,
        shutdown_tx: Some(shutdown_tx),
    })
}

/// A base URL nothing is listening on.
pub async fn closed_port_url() -> Option<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await.ok()?;
    let addr = listener.local_addr().ok()?;
    drop(listener);
    Some(format!("http://{}", addr))
}
