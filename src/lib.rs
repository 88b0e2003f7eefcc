//! Dashboard Bridge - publishes generated dashboards from a Redis stream to a
//! GitHub repository.
//!
//! The bridge reads `dashboard created` events from the `dashboards` stream
//! through a consumer group, creates one file per event through the GitHub
//! contents API, and acknowledges each entry only after its file exists.

pub mod app;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod github;
pub mod server;
pub mod stream;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;
