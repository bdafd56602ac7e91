//! Variation workflow status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow state of a variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariationStatus {
    /// Being prepared; not yet submitted.
    Draft,
    /// Submitted and awaiting a decision.
    Pending,
    /// Accepted by the approver.
    Approved,
    /// Declined by the approver.
    Rejected,
}

impl VariationStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether a variation may move from `self` to `next`.
    ///
    /// Rejected variations go back to draft for rework; approved ones are final.
    pub fn can_transition_to(&self, next: VariationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Pending)
                | (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Pending, Self::Draft)
                | (Self::Rejected, Self::Draft)
        )
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl fmt::Display for VariationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VariationStatus {
    type Err = sitehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(sitehub_core::AppError::validation(format!(
                "Invalid variation status: '{s}'. Expected one of: draft, pending, approved, rejected"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(VariationStatus::Draft.can_transition_to(VariationStatus::Pending));
        assert!(VariationStatus::Pending.can_transition_to(VariationStatus::Approved));
        assert!(VariationStatus::Rejected.can_transition_to(VariationStatus::Draft));
        assert!(!VariationStatus::Draft.can_transition_to(VariationStatus::Approved));
        assert!(!VariationStatus::Approved.can_transition_to(VariationStatus::Draft));
        assert!(VariationStatus::Approved.is_terminal());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("APPROVED".parse::<VariationStatus>().unwrap(), VariationStatus::Approved);
        assert!("closed".parse::<VariationStatus>().is_err());
    }
}
