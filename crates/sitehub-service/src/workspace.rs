//! Entity workspace: the gate, the optimistic engine, the store adapter and
//! the audit pipeline wired together for one entity type.
//!
//! Every mutation follows the same path: the permission gate is asked
//! first, the engine applies the change locally and runs the server call,
//! and once the server confirms, the audit events are queued and a
//! debounced refresh of the entity's audit trail is scheduled.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use sitehub_auth::PermissionGate;
use sitehub_core::error::AppError;
use sitehub_core::events::{AuditAction, AuditEvent};
use sitehub_core::result::AppResult;
use sitehub_core::types::{ProjectId, UserId};
use sitehub_entity::{Action, ActionType, AuditEntry, Entity, Module};

use crate::audit::{AuditTrailCache, FieldDiffLogger};
use crate::context::RequestContext;
use crate::entity::EntityService;
use crate::optimistic::{ActionOptions, Mutation, OptimisticEngine, Settled};

/// Columns the server fills in on insert.
const SERVER_COLUMNS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Optimistic, audited access to one entity type.
#[derive(Debug)]
pub struct EntityWorkspace<T: Entity> {
    module: Module,
    gate: Arc<PermissionGate>,
    engine: OptimisticEngine<T>,
    service: EntityService<T>,
    diff: FieldDiffLogger,
    trail: AuditTrailCache,
    debounce: Duration,
    audit_enabled: bool,
}

impl<T: Entity> Clone for EntityWorkspace<T> {
    fn clone(&self) -> Self {
        Self {
            module: self.module,
            gate: Arc::clone(&self.gate),
            engine: self.engine.clone(),
            service: self.service.clone(),
            diff: self.diff.clone(),
            trail: self.trail.clone(),
            debounce: self.debounce,
            audit_enabled: self.audit_enabled,
        }
    }
}

impl<T: Entity> EntityWorkspace<T> {
    /// Wire a workspace for `module`.
    pub fn new(
        module: Module,
        gate: Arc<PermissionGate>,
        engine: OptimisticEngine<T>,
        service: EntityService<T>,
        diff: FieldDiffLogger,
        trail: AuditTrailCache,
        debounce: Duration,
    ) -> Self {
        Self {
            module,
            gate,
            engine,
            service,
            diff,
            trail,
            debounce,
            audit_enabled: true,
        }
    }

    /// Turn audit logging of settled mutations on or off.
    pub fn with_audit(mut self, enabled: bool) -> Self {
        self.audit_enabled = enabled;
        self
    }

    /// The guarded module.
    pub fn module(&self) -> Module {
        self.module
    }

    /// The optimistic engine holding the visible collection.
    pub fn engine(&self) -> &OptimisticEngine<T> {
        &self.engine
    }

    /// The remote store adapter.
    pub fn service(&self) -> &EntityService<T> {
        &self.service
    }

    /// The audit trail cache.
    pub fn trail(&self) -> &AuditTrailCache {
        &self.trail
    }

    /// The visible collection.
    pub fn items(&self) -> Vec<T> {
        self.engine.items()
    }

    /// Check that `ctx` may perform `action` on a record owned by `owner`.
    pub fn authorize(&self, ctx: &RequestContext, action: Action, owner: Option<UserId>) -> AppResult<()> {
        self.gate
            .require(&ctx.roles, self.module, action, &ctx.access(owner))
    }

    /// The record as held locally, or from the store when it is not loaded.
    pub async fn current(&self, id: T::Id) -> AppResult<T> {
        match self.engine.get(id) {
            Some(record) => Ok(record),
            None => self.service.get(id).await,
        }
    }

    /// Owner of a record, looked up in the store when it is not loaded.
    pub async fn owner_of(&self, id: T::Id) -> AppResult<Option<UserId>> {
        Ok(self.current(id).await?.owner_id())
    }

    /// Load the scope's records into the visible collection.
    pub async fn load(&self, ctx: &RequestContext, scope: ProjectId, force_refresh: bool) -> AppResult<Vec<T>> {
        self.authorize(ctx, Action::View, None)?;
        let rows = self.service.fetch(scope, force_refresh).await?;
        self.engine.replace_all(rows.clone());
        Ok(rows)
    }

    /// Gate `action` on the record's owner, then hand the mutation to the engine.
    ///
    /// A denied action fails without touching the collection. Audit logging
    /// is left to the caller, which knows what events the mutation produces.
    pub async fn dispatch<F, Fut>(
        &self,
        ctx: &RequestContext,
        action: Action,
        owner: Option<UserId>,
        mutation: Mutation<T>,
        server_call: F,
        options: ActionOptions<T>,
    ) -> AppResult<Settled<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.authorize(ctx, action, owner)?;
        Ok(self.engine.settle(mutation, server_call, options).await)
    }

    /// Queue audit events for a settled mutation and schedule a trail refresh.
    pub async fn record(&self, ctx: &RequestContext, entity_id: Uuid, events: Vec<AuditEvent>) {
        if self.audit_enabled {
            self.diff.log_events(events, ctx).await;
        }
        self.trail.debounced_refresh(entity_id, self.debounce);
    }

    /// Optimistically create `draft`, confirming it with `server_call`.
    ///
    /// `draft` carries a client-side placeholder id that is replaced by the
    /// server's id once the call succeeds.
    pub async fn create_with<F, Fut>(
        &self,
        ctx: &RequestContext,
        draft: T,
        server_call: F,
        options: ActionOptions<T>,
    ) -> AppResult<Option<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let owner = draft.owner_id();
        let settled = self
            .dispatch(ctx, Action::Create, owner, Mutation::Create(draft), server_call, options)
            .await?;
        if let Some(created) = &settled.result {
            let id: Uuid = created.id().into();
            info!(table = T::TABLE, %id, user = %ctx.user_id, "Created");
            if self.audit_enabled {
                self.diff
                    .log_field_changes(id, None, created, ActionType::Create, ctx)
                    .await;
            }
            self.trail.debounced_refresh(id, self.debounce);
        }
        Ok(settled.result)
    }

    /// Optimistically create `draft` in `scope` through the store adapter.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        scope: ProjectId,
        draft: T,
        options: ActionOptions<T>,
    ) -> AppResult<Option<T>> {
        let mut row = serde_json::to_value(&draft)?;
        if let Value::Object(object) = &mut row {
            for column in SERVER_COLUMNS {
                object.remove(column);
            }
        }
        let service = self.service.clone();
        let user = ctx.user_id;
        self.create_with(
            ctx,
            draft,
            move || async move { service.create(scope, row, user).await },
            options,
        )
        .await
    }

    /// Optimistically merge `patch` into a record.
    ///
    /// Status moves go through [`change_status`](Self::change_status); a
    /// patch naming `status` or an identity column is rejected before any
    /// network call, as is an edit of a record its workflow has closed.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: T::Id,
        patch: Value,
        options: ActionOptions<T>,
    ) -> AppResult<Option<T>> {
        check_patch::<T>(&patch)?;
        let current = self.current(id).await?;
        let owner = current.owner_id();
        self.authorize(ctx, Action::Edit, owner)?;
        if !current.is_editable() {
            return Err(AppError::validation(format!(
                "{} {id} is {} and can no longer be edited",
                T::LABEL,
                current.status()
            )));
        }

        let service = self.service.clone();
        let user = ctx.user_id;
        let body = patch.clone();
        let settled = self
            .dispatch(
                ctx,
                Action::Edit,
                owner,
                Mutation::Update { id, patch },
                move || async move { service.update(id, body, user).await },
                options,
            )
            .await?;

        if let Some(updated) = &settled.result {
            if self.audit_enabled {
                self.diff
                    .log_field_changes(id.into(), settled.original.as_ref(), updated, ActionType::Update, ctx)
                    .await;
            }
            self.trail.debounced_refresh(id.into(), self.debounce);
        }
        Ok(settled.result)
    }

    /// Optimistically move a record to `status`.
    ///
    /// The gate checks the action the entity maps the target status to, so
    /// approving and submitting are guarded separately from editing.
    /// `comments` are attached to the status change audit entry.
    pub async fn change_status(
        &self,
        ctx: &RequestContext,
        id: T::Id,
        status: T::Status,
        comments: Option<String>,
        options: ActionOptions<T>,
    ) -> AppResult<Option<T>> {
        let owner = self.owner_of(id).await?;
        let service = self.service.clone();
        let user = ctx.user_id;
        let settled = self
            .dispatch(
                ctx,
                T::status_action(status),
                owner,
                Mutation::StatusChange { id, status },
                move || async move {
                    service
                        .update(id, serde_json::json!({ "status": status }), user)
                        .await
                },
                options,
            )
            .await?;

        if let (Some(updated), Some(original)) = (&settled.result, &settled.original) {
            let entity_id: Uuid = id.into();
            let events = FieldDiffLogger::diff(entity_id, original, updated)
                .into_iter()
                .map(|event| match (&comments, event.action) {
                    (Some(text), AuditAction::StatusChanged) => event.with_comments(text.clone()),
                    _ => event,
                })
                .collect();
            self.record(ctx, entity_id, events).await;
        } else if settled.result.is_some() {
            debug!(table = T::TABLE, %id, "Status changed on a record not held locally");
            self.trail.debounced_refresh(id.into(), self.debounce);
        }
        Ok(settled.result)
    }

    /// Optimistically delete a record.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        id: T::Id,
        options: ActionOptions<T>,
    ) -> AppResult<Option<T>> {
        let current = self.current(id).await?;
        let owner = current.owner_id();
        let scope = current.scope_id();
        let service = self.service.clone();
        let settled = self
            .dispatch(
                ctx,
                Action::Delete,
                owner,
                Mutation::Delete { id },
                move || async move {
                    service.delete(id, scope).await?;
                    Ok(current)
                },
                options,
            )
            .await?;

        if let Some(deleted) = &settled.result {
            if self.audit_enabled {
                self.diff
                    .log_field_changes(id.into(), settled.original.as_ref(), deleted, ActionType::Delete, ctx)
                    .await;
            }
            self.trail.invalidate(id.into());
        }
        Ok(settled.result)
    }

    /// Audit trail of a record, newest first.
    pub async fn audit_trail(
        &self,
        ctx: &RequestContext,
        id: T::Id,
        force_refresh: bool,
    ) -> AppResult<Vec<AuditEntry>> {
        // A deleted record keeps its trail; it just has no owner to check.
        let owner = self.current(id).await.ok().and_then(|record| record.owner_id());
        self.authorize(ctx, Action::View, owner)?;
        self.trail.fetch(id.into(), force_refresh, true).await
    }

    /// Cancel engine cleanup and trail refresh timers.
    pub fn shutdown(&self) {
        self.engine.shutdown();
        self.trail.shutdown();
    }
}

/// Reject patches that are not objects or that touch columns an edit may not set.
fn check_patch<T: Entity>(patch: &Value) -> AppResult<()> {
    let Value::Object(fields) = patch else {
        return Err(AppError::validation(format!("{} patch must be a JSON object", T::LABEL)));
    };
    if fields.contains_key("status") {
        return Err(AppError::validation(format!(
            "{} status is changed through a status change, not an edit",
            T::LABEL
        )));
    }
    let protected = ["id", "created_at", "updated_at", T::SCOPE_FIELD]
        .into_iter()
        .chain(T::CREATED_BY_FIELD)
        .chain(T::UPDATED_BY_FIELD);
    for column in protected {
        if fields.contains_key(column) {
            return Err(AppError::validation(format!(
                "{} field '{column}' cannot be edited",
                T::LABEL
            )));
        }
    }
    Ok(())
}
