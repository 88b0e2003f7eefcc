//! Projection of raw stream entries onto dashboard events.
//!
//! Decoding never fails. Producers are not under our control, so a missing
//! field is rendered as an empty string and the routing decision is left to
//! the dispatch table.

use serde::Serialize;

use crate::types::LogEntry;

/// Field holding the event-kind discriminator.
pub const KIND_FIELD: &str = "whatHappened";

/// Field holding the target filename, relative to the configured directory.
pub const FILENAME_FIELD: &str = "filename";

/// Field holding the content to persist.
pub const PAYLOAD_FIELD: &str = "payload";

/// The typed view of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedEvent {
    pub kind: String,
    pub filename: String,
    pub payload: String,
}

/// Decodes an entry. Absent fields become empty strings.
pub fn decode(entry: &LogEntry) -> DecodedEvent {
    let field = |key: &str| entry.field(key).unwrap_or_default().to_string();

    DecodedEvent {
        kind: field(KIND_FIELD),
        filename: field(FILENAME_FIELD),
        payload: field(PAYLOAD_FIELD),
    }
}
