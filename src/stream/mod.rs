//! Event log access: the log client trait, its Redis implementation, and the
//! consumer group manager.
//!
//! Delivery contract:
//! - one entry per read, so at most one unacknowledged entry is in flight
//! - the group cursor only advances on acknowledgment
//! - entries read but never acknowledged stay pending for their consumer

mod client;
mod error;
mod group;
mod redis_log;

pub use client::{ClaimPage, EventLog, GroupStatus};
pub use error::LogError;
pub use group::{ConsumerGroupManager, DEFAULT_CLAIM_BATCH, Reclaimed};
pub use redis_log::{DEFAULT_REDIS_ADDR, RedisLog, redis_url};
