//! Request context carrying the acting user and their roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sitehub_auth::AccessContext;
use sitehub_core::types::{OrganizationId, UserId};
use sitehub_entity::Role;

/// Context for the current user action.
///
/// Passed into service and workspace methods so that every operation
/// knows *who* is acting and with *which* roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The acting user's ID.
    pub user_id: UserId,
    /// Display name recorded in the audit trail.
    pub user_name: String,
    /// Roles held in the current organization.
    pub roles: Vec<Role>,
    /// The current organization, when one is selected.
    pub organization_id: Option<OrganizationId>,
    /// When the action was initiated.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(user_id: UserId, user_name: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            user_id,
            user_name: user_name.into(),
            roles,
            organization_id: None,
            request_time: Utc::now(),
        }
    }

    /// Scope the context to an organization.
    pub fn in_organization(mut self, organization_id: OrganizationId) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    /// Ownership context for acting on a record owned by `owner`.
    pub fn access(&self, owner: Option<UserId>) -> AccessContext {
        AccessContext::owned_by(self.user_id, owner)
    }

    /// Returns whether the current user holds the developer role.
    pub fn is_developer(&self) -> bool {
        self.roles.contains(&Role::Developer)
    }
}
