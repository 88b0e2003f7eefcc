//! The dispatch loop: read one entry, route it, publish, acknowledge.
//!
//! # Entry Processing Flow
//!
//! 1. Read the next never-delivered entry (blocks; the only idle wait)
//! 2. Decode it (cannot fail)
//! 3. Route the kind through the dispatch table
//! 4. For `dashboard created`: publish, and only on success acknowledge
//! 5. Loop
//!
//! # Critical Invariant
//!
//! An entry is acknowledged only after the publisher has returned success for
//! it. Anything else (publish failure, unrecognized kind under the default
//! policy, crash) leaves the entry pending, so delivery is at-least-once.
//!
//! # Termination
//!
//! A failed read is fatal and ends `run` with an error. A cancelled shutdown
//! token ends `run` cleanly, but only between entries: an entry that is being
//! processed always runs to completion first.
//!
//! Cancelling while a read is blocked drops that read. Redis may already have
//! delivered an entry to this identity, in which case the entry stays pending
//! under an identity that will never read again. Only reclamation
//! (`--reclaim-idle-secs`) on a later run picks it up.

use std::collections::VecDeque;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::event::{DecodedEvent, decode};
use crate::github::{PublishError, Published, Publisher};
use crate::stream::{ConsumerGroupManager, EventLog, LogError};
use crate::types::{ConsumerGroup, ConsumerId, EntryId, LogEntry, PublishSettings};

use super::stats::DispatchStats;
use super::table::{Action, DispatchTable, Route, UnrecognizedPolicy};

/// Errors that end the dispatch loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The blocking read failed.
    #[error("reading the next entry failed: {0}")]
    Read(#[source] LogError),
}

/// What happened to one entry.
#[derive(Debug)]
pub enum Outcome {
    /// Published and acknowledged.
    Published(Published),

    /// The publish failed; the entry was not acknowledged.
    PublishFailed { error: PublishError },

    /// Acknowledging failed; the entry stays pending. `published` is set when
    /// the file was created before the acknowledgment failed.
    AckFailed {
        published: Option<Published>,
        error: LogError,
    },

    /// Unrecognized kind left pending without publishing or acknowledging.
    LeftPending,

    /// Unrecognized kind acknowledged without publishing.
    AcknowledgedUnhandled,
}

impl Outcome {
    /// Returns true if the entry was acknowledged.
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Outcome::Published(_) | Outcome::AcknowledgedUnhandled)
    }
}

/// Drains the stream for one consumer identity.
pub struct Dispatcher<L, P> {
    log: L,
    publisher: P,
    group: ConsumerGroup,
    consumer: ConsumerId,
    table: DispatchTable,
    settings: PublishSettings,
    stats: DispatchStats,
    /// Entries to process before the first read (reclaimed from dead consumers).
    backlog: VecDeque<LogEntry>,
}

impl<L: EventLog, P: Publisher> Dispatcher<L, P> {
    /// Creates a dispatcher reading under the manager's group and identity.
    pub fn new(
        log: L,
        publisher: P,
        manager: &ConsumerGroupManager,
        settings: PublishSettings,
        table: DispatchTable,
    ) -> Self {
        let group = manager.group().clone();
        let consumer = manager.consumer().clone();
        let stats = DispatchStats::new(&group, &consumer);
        Dispatcher {
            log,
            publisher,
            group,
            consumer,
            table,
            settings,
            stats,
            backlog: VecDeque::new(),
        }
    }

    /// Queues entries to process before reading new ones.
    pub fn with_backlog(mut self, entries: impl IntoIterator<Item = LogEntry>) -> Self {
        self.backlog.extend(entries);
        self.stats.record_reclaimed(self.backlog.len());
        self
    }

    /// Returns a handle to the dispatcher's counters.
    pub fn stats(&self) -> DispatchStats {
        self.stats.clone()
    }

    /// Runs until the shutdown token is cancelled or a read fails.
    #[instrument(skip_all, fields(group = %self.group, consumer = %self.consumer))]
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), DispatchError> {
        info!(unrecognized = ?self.table.fallback(), "Dispatch loop started");

        if !self.backlog.is_empty() {
            debug!(queued = self.backlog.len(), "Processing reclaimed backlog");
        }
        while let Some(entry) = self.backlog.pop_front() {
            if shutdown.is_cancelled() {
                info!(
                    remaining = self.backlog.len() + 1,
                    "Shutdown signal received during backlog, stopping dispatcher"
                );
                return Ok(());
            }
            self.handle_entry(entry).await;
        }

        loop {
            let read = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping dispatcher");
                    break;
                }

                read = self.log.read_next(&self.group, &self.consumer) => read,
            };

            let entry = read.map_err(|e| {
                error!(error = %e, "Reading from stream failed");
                DispatchError::Read(e)
            })?;

            self.handle_entry(entry).await;
        }

        Ok(())
    }

    /// Processes one entry to completion and returns what happened.
    #[instrument(skip(self, entry), fields(entry_id = %entry.id))]
    pub async fn handle_entry(&mut self, entry: LogEntry) -> Outcome {
        let event = decode(&entry);

        let outcome = match self.table.route(&event.kind) {
            Route::Handle(Action::PublishDashboard) => {
                self.publish_dashboard(&entry.id, &event).await
            }
            Route::Fallback(UnrecognizedPolicy::LeavePending) => {
                debug!(kind = %event.kind, "Unrecognized event kind, leaving entry pending");
                Outcome::LeftPending
            }
            Route::Fallback(UnrecognizedPolicy::Acknowledge) => {
                match self.log.acknowledge(&self.group, &entry.id).await {
                    Ok(()) => {
                        debug!(kind = %event.kind, "Unrecognized event kind, acknowledged");
                        Outcome::AcknowledgedUnhandled
                    }
                    Err(error) => {
                        warn!(error = %error, "Acknowledging unrecognized entry failed");
                        Outcome::AckFailed {
                            published: None,
                            error,
                        }
                    }
                }
            }
        };

        self.stats.record(&entry.id, &outcome);
        outcome
    }

    async fn publish_dashboard(&mut self, id: &EntryId, event: &DecodedEvent) -> Outcome {
        let target = self.settings.target_for(&event.filename, &event.payload);
        info!(
            repo = %target.repo,
            path = %target.path,
            bytes = target.content.len(),
            "Publishing dashboard"
        );

        let published = match self.publisher.publish(target).await {
            Ok(published) => published,
            Err(error) => {
                error!(
                    error = %error,
                    kind = ?error.kind(),
                    status = ?error.status(),
                    request_id = ?error.request_id(),
                    headers = ?error.headers(),
                    "Publishing dashboard failed, entry left pending"
                );
                return Outcome::PublishFailed { error };
            }
        };

        info!(
            status = %published.status,
            digest = %published.digest.short(),
            commit = ?published.commit,
            "Dashboard published"
        );

        match self.log.acknowledge(&self.group, id).await {
            Ok(()) => Outcome::Published(published),
            Err(error) => {
                error!(
                    error = %error,
                    digest = %published.digest,
                    "Acknowledging published entry failed, it will be redelivered only if reclaimed"
                );
                Outcome::AckFailed {
                    published: Some(published),
                    error,
                }
            }
        }
    }
}
