//! Ownership context for owner-scoped decisions.

use serde::{Deserialize, Serialize};

use sitehub_core::types::UserId;

/// Who is acting and who owns the record being acted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    /// The acting user.
    pub actor_id: Option<UserId>,
    /// Owner of the target record, if known.
    pub owner_id: Option<UserId>,
}

impl AccessContext {
    /// Context with no ownership information.
    pub fn none() -> Self {
        Self::default()
    }

    /// Context for `actor` acting on a record owned by `owner`.
    pub fn owned_by(actor: UserId, owner: Option<UserId>) -> Self {
        Self {
            actor_id: Some(actor),
            owner_id: owner,
        }
    }

    /// Whether the actor owns the target record.
    pub fn is_owner(&self) -> bool {
        matches!((self.actor_id, self.owner_id), (Some(actor), Some(owner)) if actor == owner)
    }
}
