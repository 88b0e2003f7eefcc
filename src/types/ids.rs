//! Newtype wrappers for domain identifiers.
//!
//! These types keep stream entry ids, consumer identities and content digests
//! from being mixed up with each other or with plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The id of an entry in a Redis stream (`<millis>-<seq>`).
///
/// Ids are opaque to the bridge; they are only passed back to the stream when
/// acknowledging or claiming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    /// The cursor that starts a scan at the beginning of the stream.
    pub const START: &'static str = "0-0";

    pub fn new(s: impl Into<String>) -> Self {
        EntryId(s.into())
    }

    /// Returns the cursor used to start a claim scan.
    pub fn start() -> Self {
        EntryId(Self::START.to_string())
    }

    /// Returns true if this id is the start-of-stream cursor.
    pub fn is_start(&self) -> bool {
        self.0 == Self::START
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        EntryId(s.to_string())
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        EntryId(s)
    }
}

/// The identity this process reads under within a consumer group.
///
/// A fresh identity is generated for every run and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsumerId(pub String);

impl ConsumerId {
    pub fn new(s: impl Into<String>) -> Self {
        ConsumerId(s.into())
    }

    /// Generates a new random identity.
    pub fn generate() -> Self {
        ConsumerId(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A repository identifier (owner/repo format).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// The blob SHA GitHub reports for stored file content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(pub String);

impl ContentDigest {
    pub fn new(s: impl Into<String>) -> Self {
        ContentDigest(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the digest for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
