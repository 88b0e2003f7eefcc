//! Entry dispatch.
//!
//! The dispatcher reads one entry at a time, routes it by kind through the
//! dispatch table, and acknowledges it only once it has been handled.
//!
//! Module organization:
//! - `table`: kind to action routing, with a fallback for unknown kinds
//! - `dispatcher`: the read/publish/acknowledge loop
//! - `stats`: counters shared with the status endpoint

mod dispatcher;
mod stats;
mod table;


pub use dispatcher::{DispatchError, Dispatcher, Outcome};
pub use stats::{DispatchStats, StatsSnapshot};
pub use table::{Action, DASHBOARD_CREATED, DispatchTable, Route, UnrecognizedPolicy};
