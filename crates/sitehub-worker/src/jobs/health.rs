//! Backend reachability check.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, warn};

use sitehub_core::result::AppResult;
use sitehub_core::traits::backend::BackendClient;

use super::ScheduledJob;

/// Checks that the hosted backend answers.
#[derive(Debug)]
pub struct BackendHealthJob {
    backend: Arc<dyn BackendClient>,
}

impl BackendHealthJob {
    /// Check `backend` once a minute.
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ScheduledJob for BackendHealthJob {
    fn name(&self) -> &str {
        "backend_health"
    }

    fn schedule(&self) -> &str {
        "0 * * * * *"
    }

    async fn run(&self) -> AppResult<Value> {
        let healthy = match self.backend.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(backend = self.backend.backend_type(), error = %e, "Backend health check failed");
                false
            }
        };
        debug!(backend = self.backend.backend_type(), healthy, "Backend health checked");
        Ok(json!({ "task": self.name(), "healthy": healthy }))
    }
}
