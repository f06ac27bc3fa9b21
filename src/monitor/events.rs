//! Update event types.
//!
//! These types are serializable so out-of-process caches can receive them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::statement::Statement;
use crate::storage::ContainerId;
use crate::time::TimeSpan;

/// Unique identifier for an attached listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(Uuid);

impl ListenerId {
    /// Create a new random listener id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a channel subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new random subscription id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a statement was added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Insert,
    Remove,
}

/// One statement-level change to a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub kind: UpdateKind,
    /// The span the statement is scoped to; `None` for the global container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timespan: Option<TimeSpan>,
    pub statement: Statement,
    /// Container the change was applied to.
    pub container: ContainerId,
}

impl UpdateEvent {
    pub(crate) fn insert(timespan: Option<TimeSpan>, statement: Statement, container: ContainerId) -> Self {
        Self {
            kind: UpdateKind::Insert,
            timespan,
            statement,
            container,
        }
    }

    pub(crate) fn remove(timespan: Option<TimeSpan>, statement: Statement, container: ContainerId) -> Self {
        Self {
            kind: UpdateKind::Remove,
            timespan,
            statement,
            container,
        }
    }

    #[must_use]
    pub const fn is_insert(&self) -> bool {
        matches!(self.kind, UpdateKind::Insert)
    }

    /// True for changes to the time-invariant container.
    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.timespan.is_none()
    }
}
