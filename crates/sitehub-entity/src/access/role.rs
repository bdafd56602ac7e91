//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles a user can hold within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform developer. Bypasses every permission check.
    Developer,
    /// Organization administrator.
    Admin,
    /// Runs projects; approves variations and claims.
    ProjectManager,
    /// Runs a site day to day.
    SiteManager,
    /// Supervises trades on site.
    Supervisor,
    /// External subcontractor.
    Subcontractor,
    /// The project's client.
    Client,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// Every role, for exhaustive iteration.
    pub const ALL: [Role; 8] = [
        Self::Developer,
        Self::Admin,
        Self::ProjectManager,
        Self::SiteManager,
        Self::Supervisor,
        Self::Subcontractor,
        Self::Client,
        Self::Viewer,
    ];

    /// Return the role as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Developer => "developer",
            Self::Admin => "admin",
            Self::ProjectManager => "project_manager",
            Self::SiteManager => "site_manager",
            Self::Supervisor => "supervisor",
            Self::Subcontractor => "subcontractor",
            Self::Client => "client",
            Self::Viewer => "viewer",
        }
    }

    /// Whether the role belongs to the builder's own staff.
    pub fn is_internal(&self) -> bool {
        !matches!(self, Self::Subcontractor | Self::Client)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = sitehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s.to_lowercase())
            .ok_or_else(|| sitehub_core::AppError::validation(format!("Invalid role: '{s}'")))
    }
}
