//! Verification requests: the three kinds of content a user can submit.

use std::path::Path;

use anyhow::{Context, Result};

use crate::errors::ValidationError;

/// File extensions the service accepts for document uploads.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc"];

const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Content submitted for verification. Exactly one kind per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationRequest {
    Text {
        text: String,
    },
    Url {
        url: String,
    },
    File {
        bytes: Vec<u8>,
        filename: String,
        mime_type: String,
    },
}

/// Which endpoint family a request is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Text,
    Url,
    File,
}

impl RequestKind {
    /// Path segment under `/verify/`.
    pub fn path(self) -> &'static str {
        match self {
            RequestKind::Text => "text",
            RequestKind::Url => "url",
            RequestKind::File => "file",
        }
    }

    /// Progress placeholder shown while the submission is in flight.
    pub fn placeholder(self) -> (f64, &'static str) {
        match self {
            RequestKind::Text => (0.0, "Starting verification..."),
            RequestKind::Url => (0.0, "Fetching URL content..."),
            RequestKind::File => (5.0, "Uploading file..."),
        }
    }
}

impl VerificationRequest {
    pub fn text(text: impl Into<String>) -> Self {
        VerificationRequest::Text { text: text.into() }
    }

    pub fn url(url: impl Into<String>) -> Self {
        VerificationRequest::Url { url: url.into() }
    }

    /// Build a file request, guessing the MIME type from the filename.
    pub fn file(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        VerificationRequest::File {
            bytes,
            filename,
            mime_type,
        }
    }

    /// Read a document from disk into a file request.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("Path has no file name: {}", path.display()))?;
        Ok(Self::file(bytes, filename))
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            VerificationRequest::Text { .. } => RequestKind::Text,
            VerificationRequest::Url { .. } => RequestKind::Url,
            VerificationRequest::File { .. } => RequestKind::File,
        }
    }

    /// Check the request and return the form that is actually sent.
    ///
    /// Text and URL values are trimmed. The file allow-list is advisory;
    /// the service makes the final decision.
    pub fn validate(&self) -> Result<VerificationRequest, ValidationError> {
        match self {
            VerificationRequest::Text { text } => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(ValidationError::EmptyText);
                }
                Ok(VerificationRequest::text(text))
            }
            VerificationRequest::Url { url } => {
                let url = url.trim();
                if url.is_empty() {
                    return Err(ValidationError::EmptyUrl);
                }
                Ok(VerificationRequest::url(url))
            }
            VerificationRequest::File {
                bytes,
                filename,
                mime_type,
            } => {
                if bytes.is_empty() || filename.trim().is_empty() {
                    return Err(ValidationError::MissingFile);
                }
                if !is_allowed_document(filename, mime_type) {
                    return Err(ValidationError::UnsupportedFile {
                        filename: filename.clone(),
                    });
                }
                Ok(self.clone())
            }
        }
    }

    /// Whether the submit action should be enabled for this input.
    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }
}

/// `true` if the filename extension or MIME type is on the allow-list.
pub fn is_allowed_document(filename: &str, mime_type: &str) -> bool {
    let ext_ok = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| ALLOWED_EXTENSIONS.contains(&e.as_str()));
    ext_ok || ALLOWED_MIME_TYPES.contains(&mime_type)
}

/// Whether an optional (possibly unselected) input can be submitted.
pub fn can_submit(request: Option<&VerificationRequest>) -> bool {
    request.is_some_and(VerificationRequest::can_submit)
}
