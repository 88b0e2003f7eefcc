//! The event log trait.
//!
//! The dispatcher and the consumer group manager only talk to the log through
//! this trait, so tests can drive them with a scripted in-memory log.

use std::future::Future;
use std::time::Duration;

use crate::types::{ConsumerGroup, ConsumerId, EntryId, LogEntry};

use super::error::LogError;

/// What `ensure_group` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    /// The group was created by this call.
    Created,
    /// The group already existed; nothing changed.
    AlreadyExists,
}

/// One page of a stale-entry claim scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimPage {
    /// Entries now owned by the claiming consumer.
    pub entries: Vec<LogEntry>,
    /// Where the next page starts; the start cursor means the scan is done.
    pub next: EntryId,
}

/// A durable, ordered log read through a consumer group.
///
/// Implementations:
/// - `RedisLog`: Redis streams (`XGROUP`, `XREADGROUP`, `XACK`, `XAUTOCLAIM`)
/// - `ScriptedLog` (tests): in-memory script with a call journal
pub trait EventLog {
    /// Creates the group if it does not exist, starting at the beginning of
    /// retained history.
    fn ensure_group(
        &mut self,
        group: &ConsumerGroup,
    ) -> impl Future<Output = Result<GroupStatus, LogError>> + Send;

    /// Reads the next never-delivered entry for this group, blocking until one
    /// is available.
    fn read_next(
        &mut self,
        group: &ConsumerGroup,
        consumer: &ConsumerId,
    ) -> impl Future<Output = Result<LogEntry, LogError>> + Send;

    /// Marks an entry as processed for the group.
    fn acknowledge(
        &mut self,
        group: &ConsumerGroup,
        id: &EntryId,
    ) -> impl Future<Output = Result<(), LogError>> + Send;

    /// Transfers up to `count` entries pending longer than `min_idle` (under
    /// any consumer) to `consumer`, scanning from `start`.
    fn claim_stale(
        &mut self,
        group: &ConsumerGroup,
        consumer: &ConsumerId,
        min_idle: Duration,
        start: &EntryId,
        count: usize,
    ) -> impl Future<Output = Result<ClaimPage, LogError>> + Send;
}
