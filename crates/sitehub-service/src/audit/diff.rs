//! Field-level diff logger.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use sitehub_core::events::{AuditAction, AuditEvent, DomainEvent, EventPayload};
use sitehub_entity::{ActionType, Entity};

use super::outbox::AuditOutbox;
use crate::context::RequestContext;

/// Turns before/after snapshots into audit events and queues them.
///
/// Audit failures never fail the mutation that produced them; they are
/// logged and the events stay in the outbox for retry.
#[derive(Debug, Clone)]
pub struct FieldDiffLogger {
    outbox: Arc<AuditOutbox>,
}

impl FieldDiffLogger {
    /// Creates a logger queueing into `outbox`.
    pub fn new(outbox: Arc<AuditOutbox>) -> Self {
        Self { outbox }
    }

    /// The outbox events are queued in.
    pub fn outbox(&self) -> &Arc<AuditOutbox> {
        &self.outbox
    }

    /// Audit events describing the change from `original` to `updated`.
    ///
    /// Tracked scalar fields yield one event each when their values differ.
    /// Composite fields are compared as serialized JSON and yield a single
    /// "updated" event. A status change yields a status transition event.
    pub fn diff<T: Entity>(entity_id: Uuid, original: &T, updated: &T) -> Vec<AuditEvent> {
        let (before, after) = match (serde_json::to_value(original), serde_json::to_value(updated)) {
            (Ok(before), Ok(after)) => (before, after),
            (Err(e), _) | (_, Err(e)) => {
                warn!(table = T::TABLE, error = %e, "Could not serialize records for diffing");
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        for field in T::TRACKED_FIELDS {
            let old = before.get(*field).unwrap_or(&Value::Null);
            let new = after.get(*field).unwrap_or(&Value::Null);
            if old != new {
                events.push(AuditEvent::field_change(
                    T::TABLE,
                    entity_id,
                    *field,
                    display(old),
                    display(new),
                ));
            }
        }

        for field in T::COMPOSITE_FIELDS {
            let old = before.get(*field).map(Value::to_string);
            let new = after.get(*field).map(Value::to_string);
            if old != new {
                events.push(
                    AuditEvent::field_change(T::TABLE, entity_id, *field, None, None)
                        .with_comments(format!("{field} updated")),
                );
            }
        }

        if original.status() != updated.status() {
            events.push(AuditEvent::status_change(
                T::TABLE,
                entity_id,
                original.status().to_string(),
                updated.status().to_string(),
            ));
        }
        events
    }

    /// Queue the audit events for a settled mutation and try to write them.
    ///
    /// `create` and `delete` produce a single lifecycle event; `update` and
    /// `status-change` produce the field diff. Returns the number of events
    /// queued.
    pub async fn log_field_changes<T: Entity>(
        &self,
        entity_id: Uuid,
        original: Option<&T>,
        updated: &T,
        action_type: ActionType,
        actor: &RequestContext,
    ) -> usize {
        let events = match (action_type, original) {
            (ActionType::Create, _) => {
                vec![AuditEvent::new(T::TABLE, entity_id, AuditAction::Created)]
            }
            (ActionType::Delete, _) => {
                vec![AuditEvent::new(T::TABLE, entity_id, AuditAction::Deleted)]
            }
            (ActionType::Update | ActionType::StatusChange, Some(original)) => {
                Self::diff(entity_id, original, updated)
            }
            (ActionType::Update | ActionType::StatusChange, None) => {
                debug!(table = T::TABLE, %entity_id, "No snapshot to diff against");
                Vec::new()
            }
        };
        self.log_events(events, actor).await
    }

    /// Queue arbitrary audit events for `actor` and try to write them.
    pub async fn log_events(&self, events: Vec<AuditEvent>, actor: &RequestContext) -> usize {
        let count = events.len();
        if count == 0 {
            return 0;
        }
        for event in events {
            self.outbox.enqueue(DomainEvent::new(
                Some(actor.user_id),
                Some(actor.user_name.clone()),
                EventPayload::Audit(event),
            ));
        }

        let report = self.outbox.flush().await;
        if report.retried > 0 || report.dropped > 0 {
            warn!(
                retried = report.retried,
                dropped = report.dropped,
                "Audit entries not written yet"
            );
        }
        count
    }
}

/// Human-readable rendering of a field value.
fn display(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
