//! Attachment storage configuration.

use serde::{Deserialize, Serialize};

/// Where attachments are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Provider kind: `"bucket"` (hosted object storage) or `"local"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Bucket name for the hosted provider.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Root directory for the local provider.
    #[serde(default = "default_root")]
    pub local_root: String,
    /// Base URL used to build public links for the local provider.
    #[serde(default = "default_public_base")]
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            bucket: default_bucket(),
            local_root: default_root(),
            public_base_url: default_public_base(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}

fn default_bucket() -> String {
    "variation-attachments".to_string()
}

fn default_root() -> String {
    "./data/attachments".to_string()
}

fn default_public_base() -> String {
    "http://localhost:8080/attachments".to_string()
}
