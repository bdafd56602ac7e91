//! Actions checked against the permission table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Something a user can attempt within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read records.
    View,
    /// Create records.
    Create,
    /// Change records.
    Edit,
    /// Delete records.
    Delete,
    /// Approve or reject records.
    Approve,
    /// Submit records for approval.
    Submit,
    /// Send records to an external party.
    Send,
}

impl Action {
    /// Every action, for exhaustive iteration.
    pub const ALL: [Action; 7] = [
        Self::View,
        Self::Create,
        Self::Edit,
        Self::Delete,
        Self::Approve,
        Self::Submit,
        Self::Send,
    ];

    /// Return the action as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Approve => "approve",
            Self::Submit => "submit",
            Self::Send => "send",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
