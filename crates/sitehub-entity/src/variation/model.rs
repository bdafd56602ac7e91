//! Variation entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sitehub_core::types::{ProjectId, UserId, VariationId};

use super::status::VariationStatus;
use crate::access::Action;
use crate::entity::Entity;

/// One line of a variation's cost breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    /// What the line covers.
    pub description: String,
    /// Quantity of units.
    pub quantity: f64,
    /// Price per unit.
    pub unit_rate: f64,
    /// Line total.
    pub total: f64,
}

impl CostLine {
    /// Build a line whose total is `quantity * unit_rate`.
    pub fn new(description: impl Into<String>, quantity: f64, unit_rate: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_rate,
            total: quantity * unit_rate,
        }
    }
}

/// A variation (change order) raised against a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    /// Unique variation identifier.
    pub id: VariationId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Server-allocated sequence number, e.g. `"VAR-003"`.
    pub variation_number: String,
    /// Short title.
    pub title: String,
    /// Longer description of the change.
    #[serde(default)]
    pub description: Option<String>,
    /// Workflow state.
    pub status: VariationStatus,
    /// Cost impact in the project currency.
    #[serde(default)]
    pub cost_impact: f64,
    /// Schedule impact in days.
    #[serde(default)]
    pub time_impact_days: i32,
    /// Why the variation was raised.
    #[serde(default)]
    pub reason: Option<String>,
    /// Client contact name.
    #[serde(default)]
    pub client_name: Option<String>,
    /// Client contact email.
    #[serde(default)]
    pub client_email: Option<String>,
    /// Itemised costs.
    #[serde(default)]
    pub cost_breakdown: Vec<CostLine>,
    /// Storage paths of attached files.
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Whether the client was emailed.
    #[serde(default)]
    pub email_sent: bool,
    /// When the client was last emailed.
    #[serde(default)]
    pub email_sent_at: Option<DateTime<Utc>>,
    /// Who raised the variation.
    #[serde(default)]
    pub created_by: Option<UserId>,
    /// Who last changed it.
    #[serde(default)]
    pub updated_by: Option<UserId>,
    /// When it was created.
    pub created_at: DateTime<Utc>,
    /// When it was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Variation {
    /// Sum of the cost breakdown line totals.
    pub fn breakdown_total(&self) -> f64 {
        self.cost_breakdown.iter().map(|line| line.total).sum()
    }
}

impl Entity for Variation {
    type Id = VariationId;
    type Status = VariationStatus;

    const TABLE: &'static str = "variations";
    const LABEL: &'static str = "Variation";
    const TRACKED_FIELDS: &'static [&'static str] = &[
        "title",
        "description",
        "cost_impact",
        "time_impact_days",
        "reason",
        "client_name",
        "client_email",
    ];
    const COMPOSITE_FIELDS: &'static [&'static str] = &["cost_breakdown"];
    const CREATED_BY_FIELD: Option<&'static str> = Some("created_by");
    const UPDATED_BY_FIELD: Option<&'static str> = Some("updated_by");

    fn id(&self) -> VariationId {
        self.id
    }

    fn scope_id(&self) -> ProjectId {
        self.project_id
    }

    fn status(&self) -> VariationStatus {
        self.status
    }

    fn owner_id(&self) -> Option<UserId> {
        self.created_by
    }

    /// Submitted and approved variations are changed through their status only.
    fn is_editable(&self) -> bool {
        matches!(self.status, VariationStatus::Draft | VariationStatus::Rejected)
    }

    fn status_action(to: VariationStatus) -> Action {
        match to {
            VariationStatus::Pending => Action::Submit,
            VariationStatus::Approved | VariationStatus::Rejected => Action::Approve,
            VariationStatus::Draft => Action::Edit,
        }
    }

    fn can_transition(from: VariationStatus, to: VariationStatus) -> bool {
        from.can_transition_to(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserializes_sparse_row() {
        let row = serde_json::json!({
            "id": VariationId::new(),
            "project_id": ProjectId::new(),
            "variation_number": "VAR-001",
            "title": "Extra footing",
            "status": "draft",
            "created_at": "2024-03-01T00:00:00Z",
            "updated_at": "2024-03-01T00:00:00Z",
        });
        let variation: Variation = serde_json::from_value(row).unwrap();
        assert_eq!(variation.status, VariationStatus::Draft);
        assert!(variation.cost_breakdown.is_empty());
        assert!(!variation.email_sent);
        assert!(variation.is_editable());

        let submitted = Variation {
            status: VariationStatus::Pending,
            ..variation
        };
        assert!(!submitted.is_editable());
    }

    #[test]
    fn test_status_actions() {
        assert_eq!(Variation::status_action(VariationStatus::Approved), Action::Approve);
        assert_eq!(Variation::status_action(VariationStatus::Pending), Action::Submit);
        assert!(!Variation::can_transition(VariationStatus::Approved, VariationStatus::Draft));
    }

    #[test]
    fn test_breakdown_total() {
        let line_a = CostLine::new("Concrete", 2.0, 150.0);
        let line_b = CostLine::new("Labour", 8.0, 60.0);
        assert_eq!(line_a.total, 300.0);
        assert_eq!(line_a.total + line_b.total, 780.0);
    }
}
