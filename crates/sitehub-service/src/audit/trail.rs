//! Per-entity cache of audit trail entries.
//!
//! Each entity moves through `absent → loading → populated`. A populated
//! entry younger than the TTL is served without a network call; a fetch
//! requested while another is in flight returns the last known entries
//! instead of issuing a second request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use sitehub_core::error::{AppError, ErrorCode, ErrorKind};
use sitehub_core::result::AppResult;
use sitehub_core::timer::TimerRegistry;
use sitehub_core::traits::backend::BackendClient;
use sitehub_entity::AuditEntry;
use sitehub_store::functions;

#[derive(Debug, Default)]
struct TrailState {
    entries: Vec<AuditEntry>,
    fetched_at: Option<Instant>,
    in_flight: bool,
    loading: bool,
}

#[derive(Debug)]
struct TrailInner {
    backend: Arc<dyn BackendClient>,
    function: String,
    ttl: Duration,
    states: Mutex<HashMap<Uuid, TrailState>>,
    timers: TimerRegistry,
}

/// Audit trail cache for one entity table.
#[derive(Debug, Clone)]
pub struct AuditTrailCache {
    inner: Arc<TrailInner>,
}

/// Clears the in-flight flag even if the fetching future is dropped.
struct InFlight<'a> {
    inner: &'a TrailInner,
    entity_id: Uuid,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut states = self.inner.states.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(state) = states.get_mut(&self.entity_id) {
            state.in_flight = false;
            state.loading = false;
        }
    }
}

fn debounce_key(entity_id: Uuid) -> String {
    format!("audit-refresh:{entity_id}")
}

impl AuditTrailCache {
    /// Create a cache for the audit trail of `table`.
    pub fn new(
        backend: Arc<dyn BackendClient>,
        table: &str,
        ttl: Duration,
        timers: TimerRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(TrailInner {
                backend,
                function: functions::audit_trail_function(table),
                ttl,
                states: Mutex::new(HashMap::new()),
                timers,
            }),
        }
    }

    /// Audit entries of an entity, newest first.
    ///
    /// Served from cache when fresh and not `force_refresh`. `show_loading`
    /// marks the entity as loading for the duration of the request.
    pub async fn fetch(
        &self,
        entity_id: Uuid,
        force_refresh: bool,
        show_loading: bool,
    ) -> AppResult<Vec<AuditEntry>> {
        {
            let mut states = self.lock();
            let state = states.entry(entity_id).or_default();
            if state.in_flight {
                debug!(%entity_id, "Audit fetch already in flight");
                return Ok(state.entries.clone());
            }
            let fresh = state
                .fetched_at
                .is_some_and(|at| at.elapsed() < self.inner.ttl);
            if fresh && !force_refresh {
                debug!(%entity_id, "Audit trail cache hit");
                return Ok(state.entries.clone());
            }
            state.in_flight = true;
            state.loading = show_loading;
        }

        let guard = InFlight {
            inner: &self.inner,
            entity_id,
        };
        let result = self
            .inner
            .backend
            .rpc(&self.inner.function, json!({ "p_entity_id": entity_id }))
            .await
            .map_err(|e| e.with_code(ErrorCode::AuditFetchError))
            .and_then(|value| {
                serde_json::from_value::<Vec<AuditEntry>>(value).map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Serialization,
                        format!("Malformed audit trail: {e}"),
                        e,
                    )
                    .with_code(ErrorCode::AuditFetchError)
                })
            });

        match result {
            Ok(entries) => {
                {
                    let mut states = self.lock();
                    let state = states.entry(entity_id).or_default();
                    state.entries = entries.clone();
                    state.fetched_at = Some(Instant::now());
                }
                drop(guard);
                debug!(%entity_id, count = entries.len(), "Audit trail refreshed");
                Ok(entries)
            }
            Err(e) => {
                drop(guard);
                warn!(%entity_id, error = %e, "Audit trail fetch failed");
                Err(e)
            }
        }
    }

    /// Coalesce refresh requests: one forced fetch after `delay` of quiet.
    ///
    /// If a fetch is in flight when the timer fires, the refresh is queued
    /// again rather than dropped.
    pub fn debounced_refresh(&self, entity_id: Uuid, delay: Duration) {
        self.lock().entry(entity_id).or_default();
        let cache = self.clone();
        self.inner
            .timers
            .schedule(debounce_key(entity_id), delay, move || async move {
                cache.run_debounced(entity_id, delay).await;
            });
    }

    async fn run_debounced(&self, entity_id: Uuid, delay: Duration) {
        if self.is_in_flight(entity_id) {
            debug!(%entity_id, "Audit fetch in flight; re-queueing refresh");
            self.debounced_refresh(entity_id, delay);
            return;
        }
        if let Err(e) = self.fetch(entity_id, true, false).await {
            warn!(%entity_id, error = %e, "Debounced audit refresh failed");
        }
    }

    /// Cancel any pending debounced refresh and fetch now.
    pub async fn immediate_refresh(&self, entity_id: Uuid) -> AppResult<Vec<AuditEntry>> {
        self.inner.timers.cancel(&debounce_key(entity_id));
        self.fetch(entity_id, true, true).await
    }

    /// Whether a fetch with `show_loading` is running for the entity.
    pub fn is_loading(&self, entity_id: Uuid) -> bool {
        self.lock().get(&entity_id).is_some_and(|s| s.loading)
    }

    /// Whether a debounced refresh is waiting to fire.
    pub fn has_pending_refresh(&self, entity_id: Uuid) -> bool {
        self.inner.timers.is_scheduled(&debounce_key(entity_id))
    }

    /// Last known entries without touching the network.
    pub fn cached(&self, entity_id: Uuid) -> Option<Vec<AuditEntry>> {
        self.lock()
            .get(&entity_id)
            .filter(|s| s.fetched_at.is_some())
            .map(|s| s.entries.clone())
    }

    /// Forget the cached trail so the next fetch goes to the backend.
    pub fn invalidate(&self, entity_id: Uuid) {
        self.inner.timers.cancel(&debounce_key(entity_id));
        let mut states = self.lock();
        if let Some(state) = states.get_mut(&entity_id) {
            state.fetched_at = None;
        }
    }

    /// Cancel every pending refresh timer of this cache.
    pub fn shutdown(&self) {
        let entities: Vec<Uuid> = self.lock().keys().copied().collect();
        let cancelled = entities
            .into_iter()
            .filter(|id| self.inner.timers.cancel(&debounce_key(*id)))
            .count();
        debug!(cancelled, "Audit trail cache shut down");
    }

    fn is_in_flight(&self, entity_id: Uuid) -> bool {
        self.lock().get(&entity_id).is_some_and(|s| s.in_flight)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, TrailState>> {
        self.inner.states.lock().unwrap_or_else(|e| e.into_inner())
    }
}
