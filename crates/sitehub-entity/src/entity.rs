//! The record abstraction shared by every table-backed entity.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use sitehub_core::types::{ProjectId, UserId};

use crate::access::Action;

/// A uniquely identified business record mirrored from a hosted table.
pub trait Entity:
    Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Typed identifier.
    type Id: Copy
        + Eq
        + Hash
        + Debug
        + Display
        + Serialize
        + DeserializeOwned
        + From<Uuid>
        + Into<Uuid>
        + Send
        + Sync
        + 'static;

    /// Closed set of workflow states.
    type Status: Copy + Eq + Debug + Display + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Hosted table name.
    const TABLE: &'static str;

    /// Singular label used in notifications.
    const LABEL: &'static str;

    /// Column holding the scope (project) id.
    const SCOPE_FIELD: &'static str = "project_id";

    /// Scalar fields recorded by the diff logger, compared one by one.
    const TRACKED_FIELDS: &'static [&'static str];

    /// Composite fields recorded by the diff logger as a single unit.
    const COMPOSITE_FIELDS: &'static [&'static str] = &[];

    /// Column stamped with the creating user, if the table has one.
    const CREATED_BY_FIELD: Option<&'static str> = None;

    /// Column stamped with the last editing user, if the table has one.
    const UPDATED_BY_FIELD: Option<&'static str> = None;

    /// Record id.
    fn id(&self) -> Self::Id;

    /// Scope the record belongs to.
    fn scope_id(&self) -> ProjectId;

    /// Current workflow state.
    fn status(&self) -> Self::Status;

    /// User who owns the record, for owner-scoped permissions.
    fn owner_id(&self) -> Option<UserId> {
        None
    }

    /// Whether the record still accepts field edits.
    fn is_editable(&self) -> bool {
        true
    }

    /// Action the permission gate checks for a move to `to`.
    fn status_action(_to: Self::Status) -> Action {
        Action::Edit
    }

    /// Whether the workflow allows moving from `from` to `to`.
    fn can_transition(_from: Self::Status, _to: Self::Status) -> bool {
        true
    }
}
