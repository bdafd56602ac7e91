//! Periodic flush of the audit outbox.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use sitehub_core::result::AppResult;
use sitehub_service::AuditOutbox;

use super::ScheduledJob;

/// Writes audit events left queued by failed writes.
#[derive(Debug)]
pub struct OutboxFlushJob {
    outbox: Arc<AuditOutbox>,
    schedule: String,
}

impl OutboxFlushJob {
    /// Flush `outbox` on the cron `schedule`.
    pub fn new(outbox: Arc<AuditOutbox>, schedule: impl Into<String>) -> Self {
        Self {
            outbox,
            schedule: schedule.into(),
        }
    }
}

#[async_trait]
impl ScheduledJob for OutboxFlushJob {
    fn name(&self) -> &str {
        "audit_outbox_flush"
    }

    fn schedule(&self) -> &str {
        &self.schedule
    }

    async fn run(&self) -> AppResult<Value> {
        if self.outbox.pending() == 0 {
            debug!("Audit outbox empty");
            return Ok(json!({ "task": self.name(), "written": 0 }));
        }
        let report = self.outbox.flush().await;
        info!(
            written = report.written,
            retried = report.retried,
            dropped = report.dropped,
            "Audit outbox flush job complete"
        );
        Ok(json!({
            "task": self.name(),
            "written": report.written,
            "retried": report.retried,
            "dropped": report.dropped,
        }))
    }
}
