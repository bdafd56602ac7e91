//! Hosted backend connection configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the hosted backend-as-a-service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend kind: `"rest"` for the hosted service, `"memory"` for local runs.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Base URL of the hosted project.
    #[serde(default)]
    pub url: String,
    /// Public (anon) API key sent with every request.
    #[serde(default)]
    pub anon_key: String,
    /// Database schema exposed by the REST gateway.
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: String::new(),
            anon_key: String::new(),
            schema: default_schema(),
            request_timeout_seconds: default_timeout(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_timeout() -> u64 {
    30
}
