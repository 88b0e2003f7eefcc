//! Stream entries and consumer groups.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::EntryId;

/// An immutable record read from the stream.
///
/// Field values are kept as strings; values that could not be read as text
/// are dropped when the entry is built from a Redis reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The stream-assigned id.
    pub id: EntryId,
    /// Field name to value.
    pub fields: BTreeMap<String, String>,
}

impl LogEntry {
    pub fn new(id: impl Into<EntryId>) -> Self {
        LogEntry {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field, returning the entry for chaining.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns the value of a field, if present.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// A named consumer group on a stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsumerGroup {
    /// The stream key.
    pub stream: String,
    /// The group name.
    pub name: String,
}

impl ConsumerGroup {
    /// The stream dashboard events are written to.
    pub const DASHBOARD_STREAM: &'static str = "dashboards";

    /// The group every bridge instance reads under.
    pub const DASHBOARD_GROUP: &'static str = "dashboards-consumer-group";

    pub fn new(stream: impl Into<String>, name: impl Into<String>) -> Self {
        ConsumerGroup {
            stream: stream.into(),
            name: name.into(),
        }
    }

    /// The fixed group used for dashboard events.
    pub fn dashboards() -> Self {
        Self::new(Self::DASHBOARD_STREAM, Self::DASHBOARD_GROUP)
    }
}

impl fmt::Display for ConsumerGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.stream, self.name)
    }
}
