//! Application modules guarded by the permission gate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Functional areas of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    /// Project records.
    Projects,
    /// Project tasks.
    Tasks,
    /// QA inspections.
    QaInspections,
    /// Variations (change orders).
    Variations,
    /// Payment claims.
    PaymentClaims,
    /// Payment schedules.
    PaymentSchedules,
    /// Subcontractor onboarding.
    Subcontractors,
    /// Project documents.
    Documents,
}

impl Module {
    /// Every module, for exhaustive iteration.
    pub const ALL: [Module; 8] = [
        Self::Projects,
        Self::Tasks,
        Self::QaInspections,
        Self::Variations,
        Self::PaymentClaims,
        Self::PaymentSchedules,
        Self::Subcontractors,
        Self::Documents,
    ];

    /// Return the module as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Tasks => "tasks",
            Self::QaInspections => "qa_inspections",
            Self::Variations => "variations",
            Self::PaymentClaims => "payment_claims",
            Self::PaymentSchedules => "payment_schedules",
            Self::Subcontractors => "subcontractors",
            Self::Documents => "documents",
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
