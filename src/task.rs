//! Task identity: which id progress tracking is keyed on.

use serde::Serialize;
use serde_json::Value;

/// Where a task id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskSource {
    /// Issued by the verification service.
    Server,
    /// Generated locally because the service did not issue one.
    Local,
}

/// Identifies one verification task for progress tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskHandle {
    pub id: String,
    pub source: TaskSource,
}

impl TaskHandle {
    pub fn server(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: TaskSource::Server,
        }
    }

    /// Generate a local id: millisecond timestamp plus a random suffix.
    ///
    /// Unique enough within a session; not a security token.
    pub fn local() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: format!("task-{}-{}", millis, &suffix[..9]),
            source: TaskSource::Local,
        }
    }

    pub fn is_server_issued(&self) -> bool {
        self.source == TaskSource::Server
    }
}

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Prefer a non-empty `task_id` issued by the service, otherwise `fallback`.
pub fn resolve_or(payload: &Value, fallback: TaskHandle) -> TaskHandle {
    match payload.get("task_id") {
        Some(Value::String(id)) if !id.trim().is_empty() => TaskHandle::server(id.trim()),
        Some(Value::Number(n)) => TaskHandle::server(n.to_string()),
        _ => fallback,
    }
}
