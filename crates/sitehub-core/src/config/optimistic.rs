//! Optimistic update engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How long settled pending actions stay visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimisticConfig {
    /// Delay before a successful action record is removed, in milliseconds.
    #[serde(default = "default_success_clear")]
    pub success_clear_ms: u64,
    /// Delay before a failed action record is removed, in milliseconds.
    #[serde(default = "default_error_clear")]
    pub error_clear_ms: u64,
    /// Whether settled mutations produce notifications by default.
    #[serde(default = "default_true")]
    pub notify: bool,
}

impl OptimisticConfig {
    /// Success cleanup delay.
    pub fn success_clear(&self) -> Duration {
        Duration::from_millis(self.success_clear_ms)
    }

    /// Error cleanup delay.
    pub fn error_clear(&self) -> Duration {
        Duration::from_millis(self.error_clear_ms)
    }
}

impl Default for OptimisticConfig {
    fn default() -> Self {
        Self {
            success_clear_ms: default_success_clear(),
            error_clear_ms: default_error_clear(),
            notify: true,
        }
    }
}

fn default_success_clear() -> u64 {
    3000
}

fn default_error_clear() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}
