//! GitHub publishing.
//!
//! This module creates dashboard files in a repository via the contents API,
//! using octocrab for authentication and transport.
//!
//! Key features:
//! - Create-only: an existing path is reported as a conflict, never updated
//! - Failures keep status, headers and message for diagnosis
//! - No retries; the caller decides what a failure means for the entry

mod client;
mod error;
mod publisher;

pub use client::OctocrabClient;
pub use error::{PublishError, PublishErrorKind, REQUEST_ID_HEADER, is_missing_sha_message};
pub use publisher::{COMMIT_MESSAGE, Published, Publisher, contents_route};
