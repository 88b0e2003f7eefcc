//! Event log error types.
//!
//! Only two of these end the process: `Connection`, which `app::run` returns
//! from startup, and `Read`, which `Dispatcher::run` returns from the loop.
//! The rest are logged by the caller and the affected entry is left pending.

use thiserror::Error;

use crate::types::EntryId;

/// An error talking to the event log.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log service could not be reached at startup.
    #[error("cannot connect to event log at {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: redis::RedisError,
    },

    /// Creating the consumer group failed for a reason other than
    /// "already exists".
    #[error("cannot create consumer group {group}: {source}")]
    GroupCreation {
        group: String,
        #[source]
        source: redis::RedisError,
    },

    /// The blocking read itself failed.
    #[error("reading from stream failed: {0}")]
    Read(#[source] redis::RedisError),

    /// Acknowledging an entry failed.
    #[error("acknowledging entry {id} failed: {source}")]
    Ack {
        id: EntryId,
        #[source]
        source: redis::RedisError,
    },

    /// Claiming stale pending entries failed.
    #[error("claiming stale entries failed: {0}")]
    Claim(#[source] redis::RedisError),
}
