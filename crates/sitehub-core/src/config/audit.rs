//! Audit trail cache and outbox configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Audit trail settings.
///
/// One TTL applies to every audit trail read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// How long a fetched trail is served without a network call, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
    /// Quiet period used by debounced refreshes, in milliseconds.
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
    /// Cron expression for the periodic outbox flush.
    #[serde(default = "default_flush_schedule")]
    pub outbox_flush_cron: String,
    /// Attempts before a queued audit write is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl AuditConfig {
    /// Cache TTL as a duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Debounce window as a duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: default_cache_ttl(),
            debounce_ms: default_debounce(),
            outbox_flush_cron: default_flush_schedule(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_debounce() -> u64 {
    300
}

fn default_flush_schedule() -> String {
    "*/30 * * * * *".to_string()
}

fn default_max_attempts() -> u32 {
    5
}
