//! Transactional email configuration.

use serde::{Deserialize, Serialize};

/// Settings for the edge function that sends variation emails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Edge function name.
    #[serde(default = "default_function")]
    pub function_name: String,
    /// Reply-to address placed in the payload.
    #[serde(default)]
    pub reply_to: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            function_name: default_function(),
            reply_to: None,
        }
    }
}

fn default_function() -> String {
    "send-variation-email".to_string()
}
