//! Domain events emitted after successful mutations.
//!
//! Events are queued in the audit outbox and written to the backend
//! independently of the mutation that produced them.

pub mod audit;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use audit::{AuditAction, AuditEvent};

use crate::types::UserId;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The user who caused the event.
    pub actor_id: Option<UserId>,
    /// Display name of the actor at the time of the event.
    pub actor_name: Option<String>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// An audit trail entry to append.
    Audit(AuditEvent),
}

impl DomainEvent {
    /// Create a new domain event.
    pub fn new(actor_id: Option<UserId>, actor_name: Option<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor_id,
            actor_name,
            payload,
        }
    }

    /// The audit payload, if this is an audit event.
    pub fn as_audit(&self) -> Option<&AuditEvent> {
        match &self.payload {
            EventPayload::Audit(event) => Some(event),
        }
    }
}
