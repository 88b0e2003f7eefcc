//! Redis streams implementation of the event log.
//!
//! Commands used:
//! - `XGROUP CREATE <stream> <group> 0 MKSTREAM` (`BUSYGROUP` means it exists)
//! - `XREADGROUP GROUP <group> <consumer> COUNT 1 BLOCK 0 STREAMS <stream> >`
//! - `XACK <stream> <group> <id>`
//! - `XAUTOCLAIM <stream> <group> <consumer> <min-idle-ms> <start> COUNT <n>`

use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use redis::streams::{
    StreamAutoClaimOptions, StreamAutoClaimReply, StreamId, StreamReadOptions, StreamReadReply,
};
use tracing::{debug, info, instrument, warn};

use crate::types::{ConsumerGroup, ConsumerId, EntryId, LogEntry};

use super::client::{ClaimPage, EventLog, GroupStatus};
use super::error::LogError;

/// Address used when none is configured.
pub const DEFAULT_REDIS_ADDR: &str = "127.0.0.1:6379";

/// Error code Redis replies with when the group already exists.
const BUSYGROUP: &str = "BUSYGROUP";

/// Turns a configured address into a connection URL.
///
/// Accepts a bare `host:port` (as most deployments set `REDIS_ADDR`) or a full
/// `redis://`/`rediss://` URL. An empty address means the local default.
pub fn redis_url(address: &str) -> String {
    let address = address.trim();
    if address.is_empty() {
        format!("redis://{}", DEFAULT_REDIS_ADDR)
    } else if address.contains("://") {
        address.to_string()
    } else {
        format!("redis://{}", address)
    }
}

/// An event log backed by a Redis stream.
#[derive(Clone)]
pub struct RedisLog {
    connection: MultiplexedConnection,
    url: String,
}

impl RedisLog {
    /// Connects and verifies the server answers `PING`.
    #[instrument]
    pub async fn connect(address: &str) -> Result<Self, LogError> {
        let url = redis_url(address);
        let connection_error = |source| LogError::Connection {
            address: url.clone(),
            source,
        };

        let client = redis::Client::open(url.as_str()).map_err(connection_error)?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connection_error)?;
        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(connection_error)?;

        info!(url = %url, "Connected to Redis");
        Ok(RedisLog { connection, url })
    }
}

impl std::fmt::Debug for RedisLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLog")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl EventLog for RedisLog {
    async fn ensure_group(&mut self, group: &ConsumerGroup) -> Result<GroupStatus, LogError> {
        let result: redis::RedisResult<()> = self
            .connection
            .xgroup_create_mkstream(&group.stream, &group.name, "0")
            .await;

        match result {
            Ok(()) => Ok(GroupStatus::Created),
            Err(e) if e.code() == Some(BUSYGROUP) => Ok(GroupStatus::AlreadyExists),
            Err(source) => Err(LogError::GroupCreation {
                group: group.to_string(),
                source,
            }),
        }
    }

    async fn read_next(
        &mut self,
        group: &ConsumerGroup,
        consumer: &ConsumerId,
    ) -> Result<LogEntry, LogError> {
        let options = StreamReadOptions::default()
            .group(&group.name, consumer.as_str())
            .count(1)
            .block(0);

        loop {
            let reply: Option<StreamReadReply> = self
                .connection
                .xread_options(&[&group.stream], &[">"], &options)
                .await
                .map_err(LogError::Read)?;

            let entry = reply
                .and_then(|reply| reply.keys.into_iter().next())
                .and_then(|key| key.ids.into_iter().next());

            match entry {
                Some(stream_id) => return Ok(to_log_entry(stream_id)),
                // BLOCK 0 should never time out, but a nil reply just means
                // nothing was delivered.
                None => debug!("Empty stream reply, reading again"),
            }
        }
    }

    async fn acknowledge(&mut self, group: &ConsumerGroup, id: &EntryId) -> Result<(), LogError> {
        let acked: i64 = self
            .connection
            .xack(&group.stream, &group.name, &[id.as_str()])
            .await
            .map_err(|source| LogError::Ack {
                id: id.clone(),
                source,
            })?;

        if acked == 0 {
            debug!(entry_id = %id, "Entry was not pending; XACK was a no-op");
        }
        Ok(())
    }

    async fn claim_stale(
        &mut self,
        group: &ConsumerGroup,
        consumer: &ConsumerId,
        min_idle: Duration,
        start: &EntryId,
        count: usize,
    ) -> Result<ClaimPage, LogError> {
        let min_idle_ms = u64::try_from(min_idle.as_millis()).unwrap_or(u64::MAX);
        let options = StreamAutoClaimOptions::default().count(count);

        let reply: StreamAutoClaimReply = self
            .connection
            .xautoclaim_options(
                &group.stream,
                &group.name,
                consumer.as_str(),
                min_idle_ms,
                start.as_str(),
                options,
            )
            .await
            .map_err(LogError::Claim)?;

        if !reply.deleted_ids.is_empty() {
            warn!(
                deleted = reply.deleted_ids.len(),
                "Pending entries were trimmed from the stream before they could be claimed"
            );
        }

        Ok(ClaimPage {
            entries: reply.claimed.into_iter().map(to_log_entry).collect(),
            next: EntryId::new(reply.next_stream_id),
        })
    }
}

/// Converts a Redis stream record into a `LogEntry`.
///
/// Values that cannot be read as strings are dropped.
fn to_log_entry(stream_id: StreamId) -> LogEntry {
    let mut entry = LogEntry::new(stream_id.id);
    for (key, value) in stream_id.map {
        match redis::from_redis_value::<String>(&value) {
            Ok(text) => {
                entry.fields.insert(key, text);
            }
            Err(e) => {
                warn!(entry_id = %entry.id, field = %key, error = %e, "Dropping non-text field");
            }
        }
    }
    entry
}
