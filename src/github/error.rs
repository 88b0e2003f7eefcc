//! Publish error types.
//!
//! Every failure to create a file is surfaced as a `PublishError`. When GitHub
//! answered, the error keeps the status, the response headers and the message
//! from the body so the failure can be diagnosed from the log alone.
//!
//! Special case:
//! - **Conflict**: the path already exists on the branch. GitHub reports this
//!   as HTTP 409, or as HTTP 422 complaining that no `sha` was supplied (an
//!   update needs the SHA of the blob being replaced). This is what a
//!   redelivered, already-published entry runs into.

use http::{HeaderMap, StatusCode};
use thiserror::Error;

/// Header GitHub uses to identify a request in support tickets and logs.
pub const REQUEST_ID_HEADER: &str = "x-github-request-id";

/// The kind of publish failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishErrorKind {
    /// The file already exists at the target path.
    Conflict,

    /// The token is missing, invalid, or lacks `contents: write` (401/403).
    Unauthorized,

    /// The repository or branch does not exist, or is not visible to the
    /// token (404).
    NotFound,

    /// Any other 4xx response.
    Rejected,

    /// 5xx response.
    Server,

    /// No response was received.
    Transport,

    /// GitHub answered 2xx but the body was not the expected shape, or the
    /// target could not be turned into a request.
    Invalid,
}

/// A failed file creation.
#[derive(Debug, Error)]
pub enum PublishError {
    /// GitHub answered with a non-2xx status.
    #[error("GitHub rejected file creation (HTTP {status}): {message}")]
    Status {
        status: StatusCode,
        headers: HeaderMap,
        message: String,
    },

    /// The request did not complete.
    #[error("request to GitHub failed: {0}")]
    Transport(#[source] octocrab::Error),

    /// A 2xx response whose body could not be interpreted.
    #[error("unexpected response from GitHub (HTTP {status}): {message}")]
    InvalidResponse { status: StatusCode, message: String },

    /// The target cannot be expressed as a contents request.
    #[error("invalid publish target path {path:?}")]
    InvalidTarget { path: String },
}

impl PublishError {
    /// Categorizes the failure.
    pub fn kind(&self) -> PublishErrorKind {
        match self {
            PublishError::Status {
                status, message, ..
            } => classify_status(*status, message),
            PublishError::Transport(_) => PublishErrorKind::Transport,
            PublishError::InvalidResponse { .. } | PublishError::InvalidTarget { .. } => {
                PublishErrorKind::Invalid
            }
        }
    }

    /// Returns true if the path already exists on the branch.
    pub fn is_conflict(&self) -> bool {
        self.kind() == PublishErrorKind::Conflict
    }

    /// The HTTP status GitHub answered with, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PublishError::Status { status, .. } | PublishError::InvalidResponse { status, .. } => {
                Some(*status)
            }
            PublishError::Transport(_) | PublishError::InvalidTarget { .. } => None,
        }
    }

    /// The response headers, if GitHub answered.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            PublishError::Status { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// GitHub's request id for the failed call, if present.
    pub fn request_id(&self) -> Option<&str> {
        self.headers()?
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
    }
}

/// Maps a non-2xx status (and the body message) to an error kind.
fn classify_status(status: StatusCode, message: &str) -> PublishErrorKind {
    match status.as_u16() {
        409 => PublishErrorKind::Conflict,
        422 if is_missing_sha_message(message) => PublishErrorKind::Conflict,
        401 | 403 => PublishErrorKind::Unauthorized,
        404 => PublishErrorKind::NotFound,
        500..=599 => PublishErrorKind::Server,
        _ => PublishErrorKind::Rejected,
    }
}

/// Checks for GitHub's "file exists" validation message.
///
/// Creating a path that exists is treated by the contents API as an update
/// without the required blob SHA: `Invalid request. "sha" wasn't supplied.`
pub fn is_missing_sha_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("sha") && message.contains("wasn't supplied")
}
