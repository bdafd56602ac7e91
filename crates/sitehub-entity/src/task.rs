//! Project task entity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use sitehub_core::types::{ProjectId, TaskId, UserId};

use crate::entity::Entity;

/// Workflow state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    Todo,
    /// Being worked on.
    InProgress,
    /// Waiting on something else.
    Blocked,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A unit of work on a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Short title.
    pub title: String,
    /// Details.
    #[serde(default)]
    pub description: Option<String>,
    /// Workflow state.
    pub status: TaskStatus,
    /// Assigned user.
    #[serde(default)]
    pub assignee_id: Option<UserId>,
    /// Due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Priority, 1 (highest) to 5.
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// When it was created.
    pub created_at: DateTime<Utc>,
    /// When it was last changed.
    pub updated_at: DateTime<Utc>,
}

fn default_priority() -> u8 {
    3
}

impl Task {
    /// A new unassigned task in the `todo` state.
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            project_id,
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            assignee_id: None,
            due_date: None,
            priority: default_priority(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Task {
    type Id = TaskId;
    type Status = TaskStatus;

    const TABLE: &'static str = "tasks";
    const LABEL: &'static str = "Task";
    const TRACKED_FIELDS: &'static [&'static str] =
        &["title", "description", "assignee_id", "due_date", "priority"];

    fn id(&self) -> TaskId {
        self.id
    }

    fn scope_id(&self) -> ProjectId {
        self.project_id
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn owner_id(&self) -> Option<UserId> {
        self.assignee_id
    }
}
