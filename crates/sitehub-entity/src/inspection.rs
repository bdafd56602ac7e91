//! QA inspection entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use sitehub_core::types::{InspectionId, ProjectId, UserId};

use crate::entity::Entity;

/// Outcome state of an inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    /// Booked but not started.
    Scheduled,
    /// Under way.
    InProgress,
    /// Passed.
    Passed,
    /// Failed; rework required.
    Failed,
}

impl InspectionStatus {
    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A QA inspection on a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaInspection {
    /// Unique inspection identifier.
    pub id: InspectionId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Short title.
    pub title: String,
    /// Where on site.
    #[serde(default)]
    pub location: Option<String>,
    /// Outcome state.
    pub status: InspectionStatus,
    /// Responsible inspector.
    #[serde(default)]
    pub inspector_id: Option<UserId>,
    /// Inspector notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// When it was created.
    pub created_at: DateTime<Utc>,
    /// When it was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Entity for QaInspection {
    type Id = InspectionId;
    type Status = InspectionStatus;

    const TABLE: &'static str = "qa_inspections";
    const LABEL: &'static str = "Inspection";
    const TRACKED_FIELDS: &'static [&'static str] = &["title", "location", "inspector_id", "notes"];

    fn id(&self) -> InspectionId {
        self.id
    }

    fn scope_id(&self) -> ProjectId {
        self.project_id
    }

    fn status(&self) -> InspectionStatus {
        self.status
    }
}
