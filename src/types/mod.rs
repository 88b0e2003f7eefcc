//! Core domain types for the dashboard bridge.
//!
//! Stream-side types (entries, groups, ids) and repository-side types
//! (publish targets) live here so that the log adapter, the publisher and the
//! dispatcher share one vocabulary.

pub mod entry;
pub mod ids;
pub mod target;

pub use entry::{ConsumerGroup, LogEntry};
pub use ids::{ConsumerId, ContentDigest, EntryId, RepoId};
pub use target::{Committer, PublishSettings, PublishTarget, join_repo_path};
