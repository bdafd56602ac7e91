//! Feature flags.

use serde::{Deserialize, Serialize};

/// Feature switches owned by the application state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Record field-level audit entries on updates.
    #[serde(default = "default_true")]
    pub audit_trail: bool,
    /// Allow sending variation emails to clients.
    #[serde(default = "default_true")]
    pub variation_emails: bool,
    /// Allow AI-assisted reason suggestions.
    #[serde(default)]
    pub reason_suggestions: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            audit_trail: true,
            variation_emails: true,
            reason_suggestions: false,
        }
    }
}

fn default_true() -> bool {
    true
}
