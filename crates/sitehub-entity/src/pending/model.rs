//! Pending action model tracked by the optimistic engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use sitehub_core::types::ActionId;

use crate::entity::Entity;

/// Kind of optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    /// New record, prepended to the collection.
    Create,
    /// Field changes merged into an existing record.
    Update,
    /// Record removed from the collection.
    Delete,
    /// Workflow status moved.
    StatusChange,
}

impl ActionType {
    /// Return the type as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::StatusChange => "status-change",
        }
    }

    /// Past-tense verb for notifications.
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
            Self::Delete => "deleted",
            Self::StatusChange => "status updated",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle of a pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
    /// Applied locally, waiting for the server.
    Pending,
    /// Confirmed by the server.
    Success,
    /// Rejected by the server and rolled back.
    Error,
    /// Rollback in progress.
    RollingBack,
}

impl ActionStatus {
    /// Whether the action has settled.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// A mutation dispatched by the optimistic engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PendingAction<T: Entity> {
    /// Action identifier.
    pub id: ActionId,
    /// Kind of mutation.
    pub action_type: ActionType,
    /// Record the mutation targets.
    pub entity_id: T::Id,
    /// Payload as dispatched (full record for create, patch otherwise).
    pub data: serde_json::Value,
    /// Snapshot of the record before the mutation, if it existed locally.
    pub original_data: Option<T>,
    /// When the mutation was dispatched.
    pub timestamp: DateTime<Utc>,
    /// Lifecycle state.
    pub status: ActionStatus,
    /// Failure message once the action errored.
    pub error: Option<String>,
}

impl<T: Entity> PendingAction<T> {
    /// Create a new pending action stamped now.
    pub fn new(
        action_type: ActionType,
        entity_id: T::Id,
        data: serde_json::Value,
        original_data: Option<T>,
    ) -> Self {
        Self {
            id: ActionId::new(),
            action_type,
            entity_id,
            data,
            original_data,
            timestamp: Utc::now(),
            status: ActionStatus::Pending,
            error: None,
        }
    }
}
