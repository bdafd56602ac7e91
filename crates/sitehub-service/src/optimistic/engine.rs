//! Optimistic update engine.
//!
//! A mutation is spliced into the visible collection before the server is
//! asked, tracked as a [`PendingAction`], and either confirmed with the
//! server's record or rolled back to the snapshot taken before it was
//! applied. Mutations targeting the same id run one at a time, so each
//! snapshot is taken against settled state.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use dashmap::DashMap;
use serde_json::{Map, Value, json};
use tracing::{debug, error, info, warn};

use sitehub_core::config::optimistic::OptimisticConfig;
use sitehub_core::error::AppError;
use sitehub_core::result::AppResult;
use sitehub_core::timer::TimerRegistry;
use sitehub_core::traits::notifier::{Notification, Notifier};
use sitehub_core::types::ActionId;
use sitehub_entity::{ActionStatus, ActionType, Entity, PendingAction};

use super::mutation::{ActionOptions, Mutation};

struct EngineState<T: Entity> {
    items: Vec<T>,
    pending: Vec<PendingAction<T>>,
}

struct EngineInner<T: Entity> {
    state: Mutex<EngineState<T>>,
    locks: DashMap<T::Id, Arc<tokio::sync::Mutex<()>>>,
    notifier: Arc<dyn Notifier>,
    timers: TimerRegistry,
    config: OptimisticConfig,
}

impl<T: Entity> EngineInner<T> {
    fn state(&self) -> MutexGuard<'_, EngineState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remove_action(&self, action_id: ActionId) {
        self.state().pending.retain(|a| a.id != action_id);
    }
}

/// What was applied locally, kept for settling the action.
struct Applied<T> {
    action_id: ActionId,
    original: Option<T>,
    index: Option<usize>,
}

/// A settled mutation: the server's record, if it succeeded, and the
/// local snapshot taken before the mutation was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled<T> {
    /// Server record on success, `None` after a rollback.
    pub result: Option<T>,
    /// Record as it was before the mutation, if it existed locally.
    pub original: Option<T>,
}

/// Optimistic collection of `T` with pending-action tracking.
pub struct OptimisticEngine<T: Entity> {
    inner: Arc<EngineInner<T>>,
}

impl<T: Entity> Clone for OptimisticEngine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> fmt::Debug for OptimisticEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state();
        f.debug_struct("OptimisticEngine")
            .field("table", &T::TABLE)
            .field("items", &state.items.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl<T: Entity> OptimisticEngine<T> {
    /// Create an empty engine.
    pub fn new(config: OptimisticConfig, notifier: Arc<dyn Notifier>, timers: TimerRegistry) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                state: Mutex::new(EngineState {
                    items: Vec::new(),
                    pending: Vec::new(),
                }),
                locks: DashMap::new(),
                notifier,
                timers,
                config,
            }),
        }
    }

    /// Seed the collection with server-confirmed rows.
    pub fn replace_all(&self, items: Vec<T>) {
        let mut state = self.inner.state();
        debug!(table = T::TABLE, count = items.len(), "Collection replaced");
        state.items = items;
    }

    /// The visible collection.
    pub fn items(&self) -> Vec<T> {
        self.inner.state().items.clone()
    }

    /// A visible record by id.
    pub fn get(&self, id: T::Id) -> Option<T> {
        self.inner
            .state()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    /// Tracked actions, including settled ones awaiting cleanup.
    pub fn pending_actions(&self) -> Vec<PendingAction<T>> {
        self.inner.state().pending.clone()
    }

    /// Whether an unsettled action targets `id`.
    pub fn has_pending(&self, id: T::Id) -> bool {
        self.inner
            .state()
            .pending
            .iter()
            .any(|a| a.entity_id == id && a.status == ActionStatus::Pending)
    }

    /// Cancel the cleanup timers of every tracked action.
    pub fn shutdown(&self) {
        let keys: Vec<String> = self
            .inner
            .state()
            .pending
            .iter()
            .map(|a| cleanup_key(a.id))
            .collect();
        let cancelled = keys.iter().filter(|key| self.inner.timers.cancel(key)).count();
        debug!(table = T::TABLE, cancelled, "Optimistic engine shut down");
    }

    /// Apply `mutation` locally, run `server_call`, then confirm or roll back.
    ///
    /// Returns the server's record on success and `None` on failure; the
    /// failure itself is reported through the notifier and `on_error`.
    pub async fn perform<F, Fut>(
        &self,
        mutation: Mutation<T>,
        server_call: F,
        options: ActionOptions<T>,
    ) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.settle(mutation, server_call, options).await.result
    }

    /// Like [`perform`](Self::perform), also returning the pre-mutation snapshot.
    pub async fn settle<F, Fut>(
        &self,
        mutation: Mutation<T>,
        server_call: F,
        options: ActionOptions<T>,
    ) -> Settled<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let entity_id = mutation.entity_id();
        let lock = Arc::clone(
            self.inner
                .locks
                .entry(entity_id)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .value(),
        );

        let outcome = {
            let _serialized = lock.lock().await;
            self.run(mutation, server_call, options).await
        };

        drop(lock);
        self.inner
            .locks
            .remove_if(&entity_id, |_, l| Arc::strong_count(l) == 1);
        outcome
    }

    async fn run<F, Fut>(
        &self,
        mutation: Mutation<T>,
        server_call: F,
        mut options: ActionOptions<T>,
    ) -> Settled<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let entity_id = mutation.entity_id();
        let action_type = mutation.action_type();

        let applied = match self.apply(&mutation) {
            Ok(applied) => applied,
            Err(err) => {
                debug!(table = T::TABLE, id = %entity_id, error = %err, "Mutation rejected locally");
                self.notify_error(&options, &err);
                if let Some(hook) = options.take_on_error() {
                    hook(&err);
                }
                return Settled {
                    result: None,
                    original: None,
                };
            }
        };

        // Rolls the splice back if this future is dropped before the server answers.
        let mut in_flight = InFlight {
            engine: self,
            entity_id,
            action_type,
            applied,
            armed: true,
        };
        let outcome = server_call().await;
        in_flight.armed = false;
        let applied = &in_flight.applied;

        match outcome {
            Ok(result) => {
                self.confirm(entity_id, action_type, applied, &result);
                info!(
                    table = T::TABLE,
                    action = %action_type,
                    id = %result.id(),
                    "Optimistic mutation confirmed"
                );
                if !options.silent && self.inner.config.notify {
                    let message = options
                        .success_message
                        .clone()
                        .unwrap_or_else(|| format!("{} {}", T::LABEL, action_type.past_tense()));
                    self.inner.notifier.notify(Notification::success("Success", message));
                }
                if let Some(hook) = options.take_on_success() {
                    hook(&result);
                }
                self.schedule_cleanup(applied.action_id, self.inner.config.success_clear());
                Settled {
                    result: Some(result),
                    original: in_flight.take_original(),
                }
            }
            Err(err) => {
                self.roll_back(entity_id, action_type, applied.action_id, applied, &err);
                error!(
                    table = T::TABLE,
                    action = %action_type,
                    id = %entity_id,
                    error = %err,
                    "Optimistic mutation rolled back"
                );
                self.notify_error(&options, &err);
                if let Some(hook) = options.take_on_error() {
                    hook(&err);
                }
                self.schedule_cleanup(applied.action_id, self.inner.config.error_clear());
                Settled {
                    result: None,
                    original: in_flight.take_original(),
                }
            }
        }
    }

    /// Splice the mutation into the collection and record a pending action.
    fn apply(&self, mutation: &Mutation<T>) -> AppResult<Applied<T>> {
        let entity_id = mutation.entity_id();
        let mut state = self.inner.state();
        let position = state.items.iter().position(|item| item.id() == entity_id);

        let (original, index) = match mutation {
            Mutation::Create(item) => {
                state.items.insert(0, item.clone());
                (None, None)
            }
            Mutation::Update { patch, .. } => match position {
                Some(i) => {
                    let merged = merge(&state.items[i], patch)?;
                    let original = std::mem::replace(&mut state.items[i], merged);
                    (Some(original), Some(i))
                }
                None => (None, None),
            },
            Mutation::StatusChange { status, .. } => match position {
                Some(i) => {
                    let current = state.items[i].status();
                    if !T::can_transition(current, *status) {
                        return Err(AppError::validation(format!(
                            "{} cannot move from {current} to {status}",
                            T::LABEL
                        )));
                    }
                    let merged = merge(&state.items[i], &json!({ "status": status }))?;
                    let original = std::mem::replace(&mut state.items[i], merged);
                    (Some(original), Some(i))
                }
                None => (None, None),
            },
            Mutation::Delete { .. } => match position {
                Some(i) => (Some(state.items.remove(i)), Some(i)),
                None => (None, None),
            },
        };

        let action = PendingAction::new(
            mutation.action_type(),
            entity_id,
            mutation.payload(),
            original.clone(),
        );
        let action_id = action.id;
        state.pending.push(action);
        Ok(Applied {
            action_id,
            original,
            index,
        })
    }

    /// Replace the optimistic row with the server's record.
    fn confirm(&self, entity_id: T::Id, action_type: ActionType, applied: &Applied<T>, result: &T) {
        let mut state = self.inner.state();
        match action_type {
            ActionType::Create => {
                let server_id = result.id();
                if server_id != entity_id {
                    state.items.retain(|item| item.id() != server_id);
                }
                match state.items.iter().position(|item| item.id() == entity_id) {
                    Some(i) => state.items[i] = result.clone(),
                    None => state.items.insert(0, result.clone()),
                }
            }
            ActionType::Update | ActionType::StatusChange => {
                if let Some(i) = state.items.iter().position(|item| item.id() == entity_id) {
                    state.items[i] = result.clone();
                }
            }
            ActionType::Delete => state.items.retain(|item| item.id() != entity_id),
        }
        if let Some(action) = state.pending.iter_mut().find(|a| a.id == applied.action_id) {
            action.status = ActionStatus::Success;
        }
    }

    /// Undo the local splice using the snapshot.
    fn roll_back(
        &self,
        entity_id: T::Id,
        action_type: ActionType,
        action_id: ActionId,
        applied: &Applied<T>,
        err: &AppError,
    ) {
        let mut state = self.inner.state();
        if let Some(action) = state.pending.iter_mut().find(|a| a.id == action_id) {
            action.status = ActionStatus::RollingBack;
        }
        match (action_type, &applied.original) {
            (ActionType::Create, _) => state.items.retain(|item| item.id() != entity_id),
            (ActionType::Update | ActionType::StatusChange, Some(original)) => {
                if let Some(i) = state.items.iter().position(|item| item.id() == entity_id) {
                    state.items[i] = original.clone();
                }
            }
            (ActionType::Delete, Some(original)) => {
                let at = applied.index.unwrap_or(0).min(state.items.len());
                state.items.insert(at, original.clone());
            }
            (_, None) => {}
        }
        if let Some(action) = state.pending.iter_mut().find(|a| a.id == action_id) {
            action.status = ActionStatus::Error;
            action.error = Some(err.message.clone());
        }
    }

    fn notify_error(&self, options: &ActionOptions<T>, err: &AppError) {
        if options.silent || !self.inner.config.notify {
            return;
        }
        let message = match &options.error_message {
            Some(prefix) => format!("{prefix}: {}", err.message),
            None => err.message.clone(),
        };
        self.inner.notifier.notify(Notification::error("Error", message));
    }

    fn schedule_cleanup(&self, action_id: ActionId, delay: std::time::Duration) {
        let inner: Weak<EngineInner<T>> = Arc::downgrade(&self.inner);
        self.inner
            .timers
            .schedule(cleanup_key(action_id), delay, move || {
                if let Some(inner) = inner.upgrade() {
                    inner.remove_action(action_id);
                }
                std::future::ready(())
            });
    }
}

/// A mutation spliced into the collection whose server call has not returned.
struct InFlight<'a, T: Entity> {
    engine: &'a OptimisticEngine<T>,
    entity_id: T::Id,
    action_type: ActionType,
    applied: Applied<T>,
    armed: bool,
}

impl<T: Entity> InFlight<'_, T> {
    fn take_original(&mut self) -> Option<T> {
        self.applied.original.take()
    }
}

impl<T: Entity> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let err = AppError::internal("Cancelled before the server responded");
        self.engine
            .roll_back(self.entity_id, self.action_type, self.applied.action_id, &self.applied, &err);
        warn!(
            table = T::TABLE,
            action = %self.action_type,
            id = %self.entity_id,
            "Optimistic mutation cancelled, rolled back"
        );
        if tokio::runtime::Handle::try_current().is_ok() {
            self.engine
                .schedule_cleanup(self.applied.action_id, self.engine.inner.config.error_clear());
        }
    }
}

fn cleanup_key(action_id: ActionId) -> String {
    format!("pending-action:{action_id}")
}

/// Overlay the keys of `patch` onto the record's JSON form.
fn merge<T: Entity>(current: &T, patch: &Value) -> AppResult<T> {
    let Value::Object(patch) = patch else {
        return Err(AppError::validation(format!(
            "{} patch must be a JSON object",
            T::LABEL
        )));
    };
    let mut object: Map<String, Value> = match serde_json::to_value(current)? {
        Value::Object(object) => object,
        _ => return Err(AppError::internal(format!("{} is not a JSON object", T::LABEL))),
    };
    for (key, value) in patch {
        object.insert(key.clone(), value.clone());
    }
    Ok(serde_json::from_value(Value::Object(object))?)
}
