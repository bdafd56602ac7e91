//! Queue of audit events awaiting their write to the backend.
//!
//! Mutations never wait on audit writes. Events are queued here and
//! written through the per-table `log_<entity>_change` function; a write
//! that fails stays queued and is retried on the next flush until it has
//! failed `max_attempts` times.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use sitehub_core::error::AppError;
use sitehub_core::events::DomainEvent;
use sitehub_core::result::AppResult;
use sitehub_core::traits::backend::BackendClient;
use sitehub_store::functions;

#[derive(Debug, Clone)]
struct OutboxItem {
    event: DomainEvent,
    attempts: u32,
}

/// Outcome of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Events written.
    pub written: usize,
    /// Events that failed and were re-queued.
    pub retried: usize,
    /// Events dropped after exhausting their attempts.
    pub dropped: usize,
}

/// Retry queue for audit events.
#[derive(Debug)]
pub struct AuditOutbox {
    backend: Arc<dyn BackendClient>,
    queue: Mutex<VecDeque<OutboxItem>>,
    flush_lock: tokio::sync::Mutex<()>,
    max_attempts: u32,
}

impl AuditOutbox {
    /// Create an empty outbox writing through `backend`.
    pub fn new(backend: Arc<dyn BackendClient>, max_attempts: u32) -> Self {
        Self {
            backend,
            queue: Mutex::new(VecDeque::new()),
            flush_lock: tokio::sync::Mutex::new(()),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Queue an event for writing.
    pub fn enqueue(&self, event: DomainEvent) {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.push_back(OutboxItem { event, attempts: 0 });
    }

    /// Number of events waiting to be written.
    pub fn pending(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Events waiting to be written, oldest first.
    pub fn pending_events(&self) -> Vec<DomainEvent> {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|item| item.event.clone())
            .collect()
    }

    /// Write every queued event once.
    ///
    /// Only one flush runs at a time; events queued while a flush is running
    /// wait for the next one.
    pub async fn flush(&self) -> FlushReport {
        let _guard = self.flush_lock.lock().await;
        let batch: Vec<OutboxItem> = {
            let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.drain(..).collect()
        };
        if batch.is_empty() {
            return FlushReport::default();
        }

        let mut report = FlushReport::default();
        let mut retry = Vec::new();
        for mut item in batch {
            match self.write(&item.event).await {
                Ok(()) => report.written += 1,
                Err(e) => {
                    item.attempts += 1;
                    if item.attempts >= self.max_attempts {
                        warn!(
                            event_id = %item.event.id,
                            attempts = item.attempts,
                            error = %e,
                            "Dropping audit event after repeated failures"
                        );
                        report.dropped += 1;
                    } else {
                        warn!(
                            event_id = %item.event.id,
                            attempts = item.attempts,
                            error = %e,
                            "Audit write failed; will retry"
                        );
                        report.retried += 1;
                        retry.push(item);
                    }
                }
            }
        }

        if !retry.is_empty() {
            let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            for item in retry.into_iter().rev() {
                queue.push_front(item);
            }
        }

        if report.written > 0 {
            info!(
                written = report.written,
                retried = report.retried,
                dropped = report.dropped,
                "Audit outbox flushed"
            );
        }
        report
    }

    async fn write(&self, event: &DomainEvent) -> AppResult<()> {
        let Some(audit) = event.as_audit() else {
            return Ok(());
        };
        let function = functions::audit_log_function(&audit.entity_type);
        debug!(event_id = %event.id, function, "Writing audit event");
        self.backend
            .rpc(&function, log_params(event))
            .await
            .map(|_| ())
            .map_err(|e| AppError::audit(e.message))
    }
}

/// Parameters of the `log_<entity>_change` function for an event.
fn log_params(event: &DomainEvent) -> Value {
    let audit = event.as_audit();
    json!({
        "p_event_id": event.id,
        "p_timestamp": event.timestamp,
        "p_user_id": event.actor_id,
        "p_user_name": event.actor_name,
        "p_entity_type": audit.map(|a| a.entity_type.clone()),
        "p_entity_id": audit.map(|a| a.entity_id),
        "p_action_type": audit.map(|a| a.action),
        "p_field_name": audit.and_then(|a| a.field_name.clone()),
        "p_old_value": audit.and_then(|a| a.old_value.clone()),
        "p_new_value": audit.and_then(|a| a.new_value.clone()),
        "p_status_from": audit.and_then(|a| a.status_from.clone()),
        "p_status_to": audit.and_then(|a| a.status_to.clone()),
        "p_comments": audit.and_then(|a| a.comments.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitehub_core::events::{AuditEvent, EventPayload};
    use sitehub_store::MemoryBackend;
    use uuid::Uuid;

    fn event(entity: Uuid) -> DomainEvent {
        DomainEvent::new(
            None,
            Some("Sam".to_string()),
            EventPayload::Audit(AuditEvent::field_change(
                "variations",
                entity,
                "title",
                Some("A".to_string()),
                Some("B".to_string()),
            )),
        )
    }

    #[tokio::test]
    async fn test_flush_writes_and_empties() {
        let backend = Arc::new(MemoryBackend::new());
        let outbox = AuditOutbox::new(backend.clone(), 3);
        let entity = Uuid::new_v4();
        outbox.enqueue(event(entity));
        outbox.enqueue(event(entity));

        let report = outbox.flush().await;
        assert_eq!(report.written, 2);
        assert_eq!(outbox.pending(), 0);
        assert_eq!(backend.rows("audit_log").len(), 2);
        assert_eq!(backend.call_count("rpc:log_variation_change"), 2);
    }

    #[tokio::test]
    async fn test_failed_writes_are_retried_then_dropped() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_always("rpc:log_variation_change", "audit table locked");
        let outbox = AuditOutbox::new(backend.clone(), 2);
        outbox.enqueue(event(Uuid::new_v4()));

        let first = outbox.flush().await;
        assert_eq!(first.retried, 1);
        assert_eq!(outbox.pending(), 1);

        let second = outbox.flush().await;
        assert_eq!(second.dropped, 1);
        assert_eq!(outbox.pending(), 0);
    }

    #[tokio::test]
    async fn test_retry_is_idempotent_by_event_id() {
        let backend = Arc::new(MemoryBackend::new());
        let outbox = AuditOutbox::new(backend.clone(), 5);
        backend.fail_next("rpc:log_variation_change", "timeout");
        outbox.enqueue(event(Uuid::new_v4()));

        outbox.flush().await;
        outbox.flush().await;
        assert_eq!(backend.rows("audit_log").len(), 1);
    }
}
