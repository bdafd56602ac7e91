//! Input for raising a new variation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::model::CostLine;

/// Fields the user supplies when raising a variation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct VariationForm {
    /// Short title.
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    /// Longer description.
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// Cost impact.
    #[serde(default)]
    pub cost_impact: f64,
    /// Schedule impact in days.
    #[serde(default)]
    #[validate(range(min = -3650, max = 3650))]
    pub time_impact_days: i32,
    /// Why the variation was raised.
    pub reason: Option<String>,
    /// Client contact name.
    pub client_name: Option<String>,
    /// Client contact email.
    #[validate(email(message = "Client email is not a valid address"))]
    pub client_email: Option<String>,
    /// Itemised costs.
    #[serde(default)]
    pub cost_breakdown: Vec<CostLine>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_title_and_bad_email() {
        let form = VariationForm {
            title: String::new(),
            client_email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        let errors = form.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("client_email"));
    }

    #[test]
    fn test_accepts_minimal_form() {
        let form = VariationForm {
            title: "Relocate switchboard".to_string(),
            ..Default::default()
        };
        assert!(form.validate().is_ok());
    }
}
