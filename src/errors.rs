//! Typed error hierarchy for claimcheck.
//!
//! Three top-level enums cover the three subsystems:
//! - `SubmissionError`: submitting content to the verification service
//! - `ProgressTransportError`: polling or streaming task progress
//! - `ConfigError`: loading and validating client configuration

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// HTTP status attached to a failed submission; `None` when no response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpStatus(pub Option<u16>);

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "{}", code),
            None => write!(f, "unknown"),
        }
    }
}

/// Input rejected before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Text input cannot be empty")]
    EmptyText,

    #[error("URL input cannot be empty")]
    EmptyUrl,

    #[error("No file selected")]
    MissingFile,

    #[error("Unsupported file type: {filename}. Supported: .pdf, .docx, .doc")]
    UnsupportedFile { filename: String },
}

/// Errors from a single submission.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("HTTP error! status: {status} - {body}")]
    Transport { status: HttpStatus, body: String },

    #[error("Empty response from server")]
    MalformedResponse,

    /// A newer submission started before this one's response arrived.
    #[error("Submission {seq} was superseded by a newer submission")]
    Superseded { seq: u64 },
}

impl SubmissionError {
    /// Whether this error belongs in the user-visible error slot.
    ///
    /// Validation failures are recovered at the input stage and superseded
    /// responses are silently dropped.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            SubmissionError::Transport { .. } | SubmissionError::MalformedResponse
        )
    }
}

/// Errors from polling or streaming task progress. Never fatal to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressTransportError {
    #[error("Progress request failed: {0}")]
    Request(String),

    #[error("Progress endpoint returned status {status}")]
    Status { status: u16 },

    #[error("Failed to decode progress payload: {0}")]
    Decode(String),

    #[error("Progress stream closed by server")]
    StreamClosed,
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid API URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid progress transport '{0}'. Valid values: poll, stream")]
    InvalidTransport(String),

    #[error("Failed to read config file at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
