//! Audit trail events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Kind of change recorded in an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// The record was created.
    Created,
    /// A field changed value.
    FieldUpdated,
    /// The workflow status moved.
    StatusChanged,
    /// The record was deleted.
    Deleted,
    /// A client email was sent.
    EmailSent,
    /// An attachment was added.
    AttachmentAdded,
    /// An attachment was removed.
    AttachmentRemoved,
    /// A free-form comment.
    Comment,
}

impl AuditAction {
    /// Return the action as its wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::FieldUpdated => "field_updated",
            Self::StatusChanged => "status_changed",
            Self::Deleted => "deleted",
            Self::EmailSent => "email_sent",
            Self::AttachmentAdded => "attachment_added",
            Self::AttachmentRemoved => "attachment_removed",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "field_updated" => Ok(Self::FieldUpdated),
            "status_changed" => Ok(Self::StatusChanged),
            "deleted" => Ok(Self::Deleted),
            "email_sent" => Ok(Self::EmailSent),
            "attachment_added" => Ok(Self::AttachmentAdded),
            "attachment_removed" => Ok(Self::AttachmentRemoved),
            "comment" => Ok(Self::Comment),
            _ => Err(AppError::validation(format!("Invalid audit action: '{s}'"))),
        }
    }
}

/// A single audit trail entry waiting to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Table of the audited record (e.g. `"variations"`).
    pub entity_type: String,
    /// Id of the audited record.
    pub entity_id: Uuid,
    /// What happened.
    pub action: AuditAction,
    /// Changed field, for field-level entries.
    pub field_name: Option<String>,
    /// Human-readable previous value.
    pub old_value: Option<String>,
    /// Human-readable new value.
    pub new_value: Option<String>,
    /// Previous status, for status changes.
    pub status_from: Option<String>,
    /// New status, for status changes.
    pub status_to: Option<String>,
    /// Optional comment.
    pub comments: Option<String>,
}

impl AuditEvent {
    /// Entry with no field or status detail.
    pub fn new(entity_type: impl Into<String>, entity_id: Uuid, action: AuditAction) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
            action,
            field_name: None,
            old_value: None,
            new_value: None,
            status_from: None,
            status_to: None,
            comments: None,
        }
    }

    /// Field-level change entry.
    pub fn field_change(
        entity_type: impl Into<String>,
        entity_id: Uuid,
        field_name: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            field_name: Some(field_name.into()),
            old_value,
            new_value,
            ..Self::new(entity_type, entity_id, AuditAction::FieldUpdated)
        }
    }

    /// Status transition entry.
    pub fn status_change(
        entity_type: impl Into<String>,
        entity_id: Uuid,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            status_from: Some(from.into()),
            status_to: Some(to.into()),
            ..Self::new(entity_type, entity_id, AuditAction::StatusChanged)
        }
    }

    /// Attach a comment.
    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}
