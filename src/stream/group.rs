//! Consumer group setup and stale-entry reclamation.
//!
//! The manager runs once at startup. It makes sure the group exists, owns the
//! per-run consumer identity, and (when enabled) claims entries that an
//! earlier, now-dead identity read but never acknowledged.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::types::{ConsumerGroup, ConsumerId, EntryId, LogEntry};

use super::client::{EventLog, GroupStatus};
use super::error::LogError;

/// How many entries one `XAUTOCLAIM` page may transfer.
pub const DEFAULT_CLAIM_BATCH: usize = 100;

/// Upper bound on claim pages per startup, so a huge backlog cannot keep the
/// loop from ever reading new entries.
const MAX_CLAIM_PAGES: usize = 1000;

/// Entries claimed by a reclamation pass.
///
/// A failing page ends the pass early; entries claimed before it are kept
/// since they already belong to this consumer.
#[derive(Debug, Default)]
pub struct Reclaimed {
    pub entries: Vec<LogEntry>,
    pub error: Option<LogError>,
}

/// Owns the group and the identity this run reads under.
#[derive(Debug, Clone)]
pub struct ConsumerGroupManager {
    group: ConsumerGroup,
    consumer: ConsumerId,
    claim_batch: usize,
}

impl ConsumerGroupManager {
    /// Creates a manager with a freshly generated consumer identity.
    pub fn new(group: ConsumerGroup) -> Self {
        Self::with_consumer(group, ConsumerId::generate())
    }

    /// Creates a manager with a given identity.
    pub fn with_consumer(group: ConsumerGroup, consumer: ConsumerId) -> Self {
        ConsumerGroupManager {
            group,
            consumer,
            claim_batch: DEFAULT_CLAIM_BATCH,
        }
    }

    /// Sets how many entries each claim page may transfer.
    pub fn with_claim_batch(mut self, claim_batch: usize) -> Self {
        self.claim_batch = claim_batch.max(1);
        self
    }

    pub fn group(&self) -> &ConsumerGroup {
        &self.group
    }

    pub fn consumer(&self) -> &ConsumerId {
        &self.consumer
    }

    /// Ensures the group exists.
    ///
    /// A creation failure is logged and swallowed: the common case is a group
    /// that already exists in the wanted state, and concurrent first launches
    /// can race on creation. Returns `None` when creation failed.
    #[instrument(skip(self, log), fields(group = %self.group))]
    pub async fn ensure_group<L: EventLog>(&self, log: &mut L) -> Option<GroupStatus> {
        match log.ensure_group(&self.group).await {
            Ok(GroupStatus::Created) => {
                info!("Created consumer group at start of stream");
                Some(GroupStatus::Created)
            }
            Ok(GroupStatus::AlreadyExists) => {
                debug!("Consumer group already exists");
                Some(GroupStatus::AlreadyExists)
            }
            Err(e) => {
                warn!(error = %e, "Consumer group creation failed; assuming it is usable");
                None
            }
        }
    }

    /// Claims every entry pending for longer than `min_idle` under any
    /// identity in the group, transferring them to this run's identity.
    ///
    /// Pages through the pending list until the cursor wraps back to the
    /// start.
    #[instrument(skip(self, log), fields(group = %self.group, consumer = %self.consumer))]
    pub async fn reclaim_stale<L: EventLog>(
        &self,
        log: &mut L,
        min_idle: Duration,
    ) -> Reclaimed {
        let mut claimed = Vec::new();
        let mut cursor = EntryId::start();

        for _ in 0..MAX_CLAIM_PAGES {
            let page = match log
                .claim_stale(
                    &self.group,
                    &self.consumer,
                    min_idle,
                    &cursor,
                    self.claim_batch,
                )
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, claimed = claimed.len(), "Reclaiming stale entries failed");
                    return Reclaimed {
                        entries: claimed,
                        error: Some(e),
                    };
                }
            };

            debug!(
                claimed = page.entries.len(),
                next = %page.next,
                "Claimed page of stale entries"
            );
            claimed.extend(page.entries);

            if page.next.is_start() {
                break;
            }
            cursor = page.next;
        }

        if !claimed.is_empty() {
            info!(count = claimed.len(), "Reclaimed stale pending entries");
        }
        Reclaimed {
            entries: claimed,
            error: None,
        }
    }
}
