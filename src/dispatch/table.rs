//! Routing of event kinds to actions.
//!
//! The table is closed: every registered kind maps to an `Action` variant, and
//! every other kind goes to the fallback, which decides whether the entry is
//! left pending or acknowledged without being handled.

use std::collections::HashMap;

/// The kind string producers send when a dashboard has been generated.
pub const DASHBOARD_CREATED: &str = "dashboard created";

/// Something the dispatcher knows how to do with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Publish the payload as a new file, then acknowledge.
    PublishDashboard,
}

/// What happens to entries whose kind has no registered action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnrecognizedPolicy {
    /// Neither publish nor acknowledge. The entry stays pending for this
    /// consumer indefinitely.
    #[default]
    LeavePending,

    /// Acknowledge without publishing, so irrelevant kinds do not pile up in
    /// the pending list.
    Acknowledge,
}

/// The routing decision for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Handle(Action),
    Fallback(UnrecognizedPolicy),
}

/// Maps event kinds to actions.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    routes: HashMap<String, Action>,
    fallback: UnrecognizedPolicy,
}

impl DispatchTable {
    /// An empty table where every kind takes the fallback.
    pub fn new(fallback: UnrecognizedPolicy) -> Self {
        DispatchTable {
            routes: HashMap::new(),
            fallback,
        }
    }

    /// The table the bridge runs with: `dashboard created` publishes.
    pub fn dashboards(fallback: UnrecognizedPolicy) -> Self {
        Self::new(fallback).with_route(DASHBOARD_CREATED, Action::PublishDashboard)
    }

    /// Registers an action for a kind, replacing any previous one.
    pub fn with_route(mut self, kind: impl Into<String>, action: Action) -> Self {
        self.routes.insert(kind.into(), action);
        self
    }

    /// Looks up a kind. Matching is exact (case and whitespace sensitive).
    pub fn route(&self, kind: &str) -> Route {
        match self.routes.get(kind) {
            Some(action) => Route::Handle(*action),
            None => Route::Fallback(self.fallback),
        }
    }

    pub fn fallback(&self) -> UnrecognizedPolicy {
        self.fallback
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::dashboards(UnrecognizedPolicy::default())
    }
}
