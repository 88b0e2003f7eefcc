//! Shared test utilities: scripted fakes for the event log and the publisher,
//! and arbitrary generators for property-based testing.
//!
//! Both fakes record into one `Journal`, so tests can assert the relative
//! order of reads, publishes and acknowledgments.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use http::{HeaderMap, StatusCode};
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::dispatch::DASHBOARD_CREATED;
use crate::event::{FILENAME_FIELD, KIND_FIELD, PAYLOAD_FIELD};
use crate::github::{PublishError, Published, Publisher};
use crate::stream::{ClaimPage, EventLog, GroupStatus, LogError};
use crate::types::{
    ConsumerGroup, ConsumerId, ContentDigest, EntryId, LogEntry, PublishSettings, PublishTarget,
    RepoId,
};

/// One interaction with a fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EnsureGroup(ConsumerGroup),
    /// A read; `None` when it returned an error.
    Read(Option<EntryId>),
    Ack(EntryId),
    Claim { start: EntryId, count: usize },
    /// A publish attempt: target path and the bytes to store there.
    Publish { path: String, content: Vec<u8> },
}

/// Ordered record of calls, shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Call>>>);

impl Journal {
    pub fn record(&self, call: Call) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn acks(&self) -> Vec<EntryId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Ack(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn publishes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Publish { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    /// Contents of every publish attempt, in order.
    pub fn published_contents(&self) -> Vec<Vec<u8>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Publish { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn reads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Read(_)))
            .count()
    }
}

fn io_error(detail: &'static str) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::IoError, detail))
}

/// An in-memory event log that replays a script.
///
/// Reads pop the scripted results in order. Once the script is exhausted a
/// read never completes, after cancelling the drain token if one was given,
/// which is how tests stop a running dispatcher.
#[derive(Debug, Default)]
pub struct ScriptedLog {
    journal: Journal,
    group_status: Option<Result<GroupStatus, LogError>>,
    reads: VecDeque<Result<LogEntry, LogError>>,
    stale: Vec<LogEntry>,
    claim_failure: bool,
    ack_failure: bool,
    on_drained: Option<CancellationToken>,
}

impl ScriptedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn with_entry(mut self, entry: LogEntry) -> Self {
        self.reads.push_back(Ok(entry));
        self
    }

    pub fn with_read_error(mut self) -> Self {
        self.reads.push_back(Err(Self::read_error()));
        self
    }

    /// Sets what `ensure_group` returns (default: `Created`).
    pub fn with_group_status(mut self, status: Result<GroupStatus, LogError>) -> Self {
        self.group_status = Some(status);
        self
    }

    /// Adds an entry pending under some other consumer.
    pub fn with_stale(mut self, entry: LogEntry) -> Self {
        self.stale.push(entry);
        self
    }

    pub fn with_claim_failure(mut self) -> Self {
        self.claim_failure = true;
        self
    }

    /// Makes every acknowledgment fail.
    pub fn with_ack_failure(mut self) -> Self {
        self.ack_failure = true;
        self
    }

    /// Cancels `token` when a read finds the script empty.
    pub fn cancel_when_drained(mut self, token: CancellationToken) -> Self {
        self.on_drained = Some(token);
        self
    }

    pub fn group_error() -> LogError {
        LogError::GroupCreation {
            group: ConsumerGroup::dashboards().to_string(),
            source: io_error("group creation refused"),
        }
    }

    pub fn read_error() -> LogError {
        LogError::Read(io_error("connection reset"))
    }
}

impl EventLog for ScriptedLog {
    async fn ensure_group(&mut self, group: &ConsumerGroup) -> Result<GroupStatus, LogError> {
        self.journal.record(Call::EnsureGroup(group.clone()));
        self.group_status.take().unwrap_or(Ok(GroupStatus::Created))
    }

    async fn read_next(
        &mut self,
        _group: &ConsumerGroup,
        _consumer: &ConsumerId,
    ) -> Result<LogEntry, LogError> {
        match self.reads.pop_front() {
            Some(result) => {
                let id = result.as_ref().ok().map(|entry| entry.id.clone());
                self.journal.record(Call::Read(id));
                result
            }
            None => {
                if let Some(token) = &self.on_drained {
                    token.cancel();
                }
                std::future::pending().await
            }
        }
    }

    async fn acknowledge(&mut self, _group: &ConsumerGroup, id: &EntryId) -> Result<(), LogError> {
        self.journal.record(Call::Ack(id.clone()));
        if self.ack_failure {
            return Err(LogError::Ack {
                id: id.clone(),
                source: io_error("broken pipe"),
            });
        }
        Ok(())
    }

    async fn claim_stale(
        &mut self,
        _group: &ConsumerGroup,
        _consumer: &ConsumerId,
        _min_idle: Duration,
        start: &EntryId,
        count: usize,
    ) -> Result<ClaimPage, LogError> {
        self.journal.record(Call::Claim {
            start: start.clone(),
            count,
        });
        if self.claim_failure {
            return Err(LogError::Claim(io_error("claim refused")));
        }

        let from = if start.is_start() {
            0
        } else {
            self.stale
                .iter()
                .position(|entry| entry.id == *start)
                .unwrap_or(self.stale.len())
        };
        let to = (from + count).min(self.stale.len());
        let next = self
            .stale
            .get(to)
            .map(|entry| entry.id.clone())
            .unwrap_or_else(EntryId::start);

        Ok(ClaimPage {
            entries: self.stale[from..to].to_vec(),
            next,
        })
    }
}

/// An in-memory repository that only accepts new paths.
///
/// Scripted results are returned first, in order. After that a publish
/// succeeds unless its `(branch, path)` was already created, in which case it
/// fails with a conflict, like the contents API does.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPublisher {
    journal: Journal,
    scripted: Arc<Mutex<VecDeque<Result<Published, PublishError>>>>,
    existing: Arc<Mutex<HashSet<(Option<String>, String)>>>,
}

impl ScriptedPublisher {
    /// Creates a publisher recording into `journal`.
    pub fn sharing(journal: Journal) -> Self {
        ScriptedPublisher {
            journal,
            ..Self::default()
        }
    }

    /// Queues a result for the next publish.
    pub fn with_result(self, result: Result<Published, PublishError>) -> Self {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
        self
    }

    /// Marks a path as already present on a branch.
    pub fn with_existing(self, branch: Option<&str>, path: &str) -> Self {
        self.existing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((branch.map(str::to_string), path.to_string()));
        self
    }

    pub fn conflict() -> PublishError {
        PublishError::Status {
            status: StatusCode::CONFLICT,
            headers: HeaderMap::new(),
            message: "Conflict".to_string(),
        }
    }

    pub fn server_error() -> PublishError {
        PublishError::Status {
            status: StatusCode::BAD_GATEWAY,
            headers: HeaderMap::new(),
            message: "Bad Gateway".to_string(),
        }
    }

    pub fn published(sha: &str) -> Published {
        Published {
            digest: ContentDigest::new(sha),
            commit: None,
            status: StatusCode::CREATED,
        }
    }
}

impl Publisher for ScriptedPublisher {
    async fn publish(&self, target: PublishTarget) -> Result<Published, PublishError> {
        self.journal.record(Call::Publish {
            path: target.path.clone(),
            content: target.content.clone(),
        });

        let key = (target.branch.clone(), target.path.clone());
        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let mut existing = self.existing.lock().unwrap_or_else(PoisonError::into_inner);

        match scripted {
            Some(Ok(published)) => {
                existing.insert(key);
                Ok(published)
            }
            Some(Err(e)) => Err(e),
            None if existing.contains(&key) => Err(Self::conflict()),
            None => {
                let sha = format!("{:040x}", existing.len() + 1);
                existing.insert(key);
                Ok(Self::published(&sha))
            }
        }
    }
}

/// A `dashboard created` entry.
pub fn dashboard_entry(id: &str, filename: &str, payload: &str) -> LogEntry {
    LogEntry::new(id)
        .with_field(KIND_FIELD, DASHBOARD_CREATED)
        .with_field(FILENAME_FIELD, filename)
        .with_field(PAYLOAD_FIELD, payload)
}

/// An entry of an arbitrary kind.
pub fn kind_entry(id: &str, kind: &str) -> LogEntry {
    LogEntry::new(id)
        .with_field(KIND_FIELD, kind)
        .with_field(FILENAME_FIELD, "x")
        .with_field(PAYLOAD_FIELD, "y")
}

/// Settings writing under `grafana/` on the default branch.
pub fn test_settings() -> PublishSettings {
    PublishSettings {
        repo: RepoId::new("acme", "dashboards"),
        branch: None,
        directory: "grafana".to_string(),
        committer: None,
    }
}

pub fn arb_entry_id() -> impl Strategy<Value = EntryId> {
    (1u64..u64::MAX / 2, 0u32..16).prop_map(|(ms, seq)| EntryId::new(format!("{ms}-{seq}")))
}

/// Kinds other than `dashboard created`.
pub fn arb_unrecognized_kind() -> impl Strategy<Value = String> {
    "[a-zA-Z ]{0,30}".prop_filter("must not be the recognized kind", |k| k != DASHBOARD_CREATED)
}

pub fn arb_filename() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,20}\\.json".prop_map(String::from)
}
