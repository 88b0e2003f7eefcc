//! Shared counters for the status endpoint.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{ConsumerGroup, ConsumerId, EntryId};

use super::dispatcher::Outcome;

/// Point-in-time view of the dispatcher's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub stream: String,
    pub group: String,
    pub consumer: String,
    pub published: u64,
    pub publish_failed: u64,
    pub ack_failed: u64,
    pub left_pending: u64,
    pub acknowledged_unhandled: u64,
    pub reclaimed: u64,
    pub last_acked: Option<EntryId>,
    pub last_published_at: Option<DateTime<Utc>>,
}

/// Cheaply cloneable handle to the counters.
///
/// The dispatcher is the only writer; the status server only reads.
#[derive(Debug, Clone)]
pub struct DispatchStats {
    inner: Arc<Mutex<StatsSnapshot>>,
}

impl DispatchStats {
    pub fn new(group: &ConsumerGroup, consumer: &ConsumerId) -> Self {
        DispatchStats {
            inner: Arc::new(Mutex::new(StatsSnapshot {
                stream: group.stream.clone(),
                group: group.name.clone(),
                consumer: consumer.to_string(),
                published: 0,
                publish_failed: 0,
                ack_failed: 0,
                left_pending: 0,
                acknowledged_unhandled: 0,
                reclaimed: 0,
                last_acked: None,
                last_published_at: None,
            })),
        }
    }

    /// Records the outcome of one entry.
    pub fn record(&self, id: &EntryId, outcome: &Outcome) {
        self.update(|stats| match outcome {
            Outcome::Published(_) => {
                stats.published += 1;
                stats.last_acked = Some(id.clone());
                stats.last_published_at = Some(Utc::now());
            }
            Outcome::PublishFailed { .. } => stats.publish_failed += 1,
            Outcome::AckFailed { published, .. } => {
                stats.ack_failed += 1;
                if published.is_some() {
                    stats.last_published_at = Some(Utc::now());
                }
            }
            Outcome::LeftPending => stats.left_pending += 1,
            Outcome::AcknowledgedUnhandled => {
                stats.acknowledged_unhandled += 1;
                stats.last_acked = Some(id.clone());
            }
        });
    }

    /// Records entries taken over from other consumers.
    pub fn record_reclaimed(&self, count: usize) {
        self.update(|stats| stats.reclaimed += count as u64);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut StatsSnapshot)) {
        let mut stats = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut stats);
    }
}
