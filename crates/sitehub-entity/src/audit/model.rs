//! Audit trail entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sitehub_core::events::{AuditAction, DomainEvent};
use sitehub_core::types::{AuditEntryId, UserId};

/// An immutable audit trail entry as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry identifier.
    pub id: AuditEntryId,
    /// Record the entry belongs to.
    pub entity_id: Uuid,
    /// Acting user.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Acting user's display name.
    #[serde(default)]
    pub user_name: Option<String>,
    /// What happened.
    pub action_type: AuditAction,
    /// Changed field, for field-level entries.
    #[serde(default)]
    pub field_name: Option<String>,
    /// Previous value.
    #[serde(default)]
    pub old_value: Option<String>,
    /// New value.
    #[serde(default)]
    pub new_value: Option<String>,
    /// Previous status.
    #[serde(default)]
    pub status_from: Option<String>,
    /// New status.
    #[serde(default)]
    pub status_to: Option<String>,
    /// Free-form comment.
    #[serde(default)]
    pub comments: Option<String>,
    /// When the change happened.
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Build the entry an audit event will become once written.
    pub fn from_event(event: &DomainEvent) -> Option<Self> {
        let audit = event.as_audit()?;
        Some(Self {
            id: AuditEntryId::from(event.id),
            entity_id: audit.entity_id,
            user_id: event.actor_id,
            user_name: event.actor_name.clone(),
            action_type: audit.action,
            field_name: audit.field_name.clone(),
            old_value: audit.old_value.clone(),
            new_value: audit.new_value.clone(),
            status_from: audit.status_from.clone(),
            status_to: audit.status_to.clone(),
            comments: audit.comments.clone(),
            timestamp: event.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitehub_core::events::{AuditEvent, EventPayload};

    #[test]
    fn test_from_event_copies_actor_and_fields() {
        let entity_id = Uuid::new_v4();
        let actor = UserId::new();
        let event = DomainEvent::new(
            Some(actor),
            Some("Pat".to_string()),
            EventPayload::Audit(AuditEvent::field_change(
                "variations",
                entity_id,
                "title",
                Some("A".to_string()),
                Some("B".to_string()),
            )),
        );
        let entry = AuditEntry::from_event(&event).unwrap();
        assert_eq!(entry.entity_id, entity_id);
        assert_eq!(entry.user_id, Some(actor));
        assert_eq!(entry.user_name.as_deref(), Some("Pat"));
        assert_eq!(entry.action_type, AuditAction::FieldUpdated);
        assert_eq!(entry.field_name.as_deref(), Some("title"));
        assert_eq!(entry.id.into_uuid(), event.id);
    }
}
