//! Publish targets: where and as whom a dashboard is written.

use serde::{Deserialize, Serialize};

use super::ids::RepoId;

/// Commit attribution for created files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

impl Committer {
    /// Builds a committer, or `None` if either the name or the email is blank.
    ///
    /// GitHub rejects a committer object with a missing field, so a partial
    /// identity falls back to the authenticated user.
    pub fn from_parts(name: impl Into<String>, email: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let email = email.into();
        if name.trim().is_empty() || email.trim().is_empty() {
            return None;
        }
        Some(Committer { name, email })
    }
}

/// The static part of every publish: repository, branch, base directory and
/// committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub repo: RepoId,
    /// Target branch; `None` writes to the repository's default branch.
    pub branch: Option<String>,
    /// Directory prefix inside the repository; may be empty.
    pub directory: String,
    pub committer: Option<Committer>,
}

impl PublishSettings {
    /// Resolves the target for one decoded event.
    pub fn target_for(&self, filename: &str, payload: &str) -> PublishTarget {
        PublishTarget {
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            path: join_repo_path(&self.directory, filename),
            content: payload.as_bytes().to_vec(),
            committer: self.committer.clone(),
        }
    }
}

/// The fully resolved destination of one file-creation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub repo: RepoId,
    pub branch: Option<String>,
    /// Slash-separated path relative to the repository root.
    pub path: String,
    pub content: Vec<u8>,
    pub committer: Option<Committer>,
}

/// Joins a directory and a filename into a clean repository path.
///
/// Empty segments and `.` are dropped and `..` removes the previous segment
/// (never escaping the root), so the result has no leading, trailing or
/// doubled slashes.
pub fn join_repo_path(directory: &str, filename: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in directory.split('/').chain(filename.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
