//! Optimistic, audited variation workflow.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::info;

use sitehub_core::config::features::FeatureFlags;
use sitehub_core::error::{AppError, ErrorCode};
use sitehub_core::events::{AuditAction, AuditEvent};
use sitehub_core::result::AppResult;
use sitehub_core::types::{ProjectId, VariationId};
use sitehub_entity::{Action, AuditEntry, Entity, Variation, VariationForm, VariationStatus};

use super::service::{ReasonSuggestion, VariationService, validate_form};
use crate::context::RequestContext;
use crate::optimistic::{ActionOptions, Mutation};
use crate::workspace::EntityWorkspace;

/// The variations screen: the optimistic collection plus the variation
/// service's extra operations, each gated and audited.
#[derive(Debug, Clone)]
pub struct VariationWorkspace {
    workspace: EntityWorkspace<Variation>,
    service: VariationService,
    flags: Arc<FeatureFlags>,
}

impl VariationWorkspace {
    /// Creates a new variation workspace.
    pub fn new(workspace: EntityWorkspace<Variation>, service: VariationService, flags: Arc<FeatureFlags>) -> Self {
        Self {
            workspace,
            service,
            flags,
        }
    }

    /// The generic entity workspace.
    pub fn workspace(&self) -> &EntityWorkspace<Variation> {
        &self.workspace
    }

    /// The variation service.
    pub fn service(&self) -> &VariationService {
        &self.service
    }

    /// The visible variations.
    pub fn items(&self) -> Vec<Variation> {
        self.workspace.items()
    }

    /// A visible variation by id.
    pub fn get(&self, id: VariationId) -> Option<Variation> {
        self.workspace.engine().get(id)
    }

    /// Load a project's variations.
    pub async fn load(&self, ctx: &RequestContext, scope: ProjectId, force_refresh: bool) -> AppResult<Vec<Variation>> {
        self.workspace.load(ctx, scope, force_refresh).await
    }

    /// Raise a variation from `form`.
    ///
    /// A draft with a placeholder id and no number is shown immediately;
    /// the server allocates the number and id.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        scope: ProjectId,
        form: VariationForm,
        options: ActionOptions<Variation>,
    ) -> AppResult<Option<Variation>> {
        validate_form(&form)?;
        let draft = draft_from_form(scope, &form, ctx);
        let service = self.service.clone();
        let user = ctx.user_id;
        self.workspace
            .create_with(
                ctx,
                draft,
                move || async move { service.create(scope, &form, user).await },
                options,
            )
            .await
    }

    /// Merge `patch` into a variation.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: VariationId,
        patch: Value,
        options: ActionOptions<Variation>,
    ) -> AppResult<Option<Variation>> {
        self.workspace.update(ctx, id, patch, options).await
    }

    /// Submit, approve, reject or return a variation to draft.
    pub async fn change_status(
        &self,
        ctx: &RequestContext,
        id: VariationId,
        status: VariationStatus,
        comments: Option<String>,
        options: ActionOptions<Variation>,
    ) -> AppResult<Option<Variation>> {
        self.workspace.change_status(ctx, id, status, comments, options).await
    }

    /// Delete a variation.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        id: VariationId,
        options: ActionOptions<Variation>,
    ) -> AppResult<Option<Variation>> {
        self.workspace.delete(ctx, id, options).await
    }

    /// Email a variation to its client.
    ///
    /// A variation without a client address fails with
    /// `MISSING_CLIENT_EMAIL` before anything is applied or sent.
    pub async fn send_email(
        &self,
        ctx: &RequestContext,
        id: VariationId,
        options: ActionOptions<Variation>,
    ) -> AppResult<Option<Variation>> {
        if !self.flags.variation_emails {
            return Err(AppError::validation("Variation emails are disabled"));
        }
        let current = self.workspace.current(id).await?;
        let owner = current.owner_id();
        self.workspace.authorize(ctx, Action::Send, owner)?;
        if current
            .client_email
            .as_deref()
            .is_none_or(|address| address.trim().is_empty())
        {
            return Err(AppError::validation(format!(
                "Variation {} has no client email",
                current.variation_number
            ))
            .with_code(ErrorCode::MissingClientEmail));
        }

        let service = self.service.clone();
        let sender = ctx.clone();
        let settled = self
            .workspace
            .dispatch(
                ctx,
                Action::Send,
                owner,
                Mutation::Update {
                    id,
                    patch: json!({ "email_sent": true, "email_sent_at": Utc::now() }),
                },
                move || async move { service.send_email(id, &sender).await },
                options,
            )
            .await?;

        if let Some(sent) = &settled.result {
            info!(%id, number = %sent.variation_number, "Variation emailed to client");
            let event = AuditEvent::new(Variation::TABLE, id.into_uuid(), AuditAction::EmailSent)
                .with_comments(format!(
                    "Sent to {}",
                    sent.client_email.as_deref().unwrap_or_default()
                ));
            self.workspace.record(ctx, id.into_uuid(), vec![event]).await;
        }
        Ok(settled.result)
    }

    /// Attach a file to a variation.
    pub async fn add_attachment(
        &self,
        ctx: &RequestContext,
        id: VariationId,
        filename: &str,
        data: Bytes,
        options: ActionOptions<Variation>,
    ) -> AppResult<Option<Variation>> {
        let owner = self.workspace.owner_of(id).await?;
        let service = self.service.clone();
        let user = ctx.user_id;
        let name = filename.to_string();
        let settled = self
            .workspace
            .dispatch(
                ctx,
                Action::Edit,
                owner,
                Mutation::Update {
                    id,
                    patch: json!({}),
                },
                move || async move {
                    let (updated, _) = service.add_attachment(id, &name, data, user).await?;
                    Ok(updated)
                },
                options,
            )
            .await?;

        if settled.result.is_some() {
            let event = AuditEvent::new(Variation::TABLE, id.into_uuid(), AuditAction::AttachmentAdded)
                .with_comments(filename.to_string());
            self.workspace.record(ctx, id.into_uuid(), vec![event]).await;
        }
        Ok(settled.result)
    }

    /// Remove an attachment by storage path.
    ///
    /// The path disappears from the visible record before the server
    /// confirms and comes back if removal fails.
    pub async fn remove_attachment(
        &self,
        ctx: &RequestContext,
        id: VariationId,
        path: &str,
        options: ActionOptions<Variation>,
    ) -> AppResult<Option<Variation>> {
        let current = self.workspace.current(id).await?;
        let owner = current.owner_id();
        let remaining: Vec<String> = current
            .attachments
            .into_iter()
            .filter(|p| p != path)
            .collect();
        let service = self.service.clone();
        let user = ctx.user_id;
        let target = path.to_string();
        let settled = self
            .workspace
            .dispatch(
                ctx,
                Action::Edit,
                owner,
                Mutation::Update {
                    id,
                    patch: json!({ "attachments": remaining }),
                },
                move || async move { service.remove_attachment(id, &target, user).await },
                options,
            )
            .await?;

        if settled.result.is_some() {
            let event = AuditEvent::new(Variation::TABLE, id.into_uuid(), AuditAction::AttachmentRemoved)
                .with_comments(path.to_string());
            self.workspace.record(ctx, id.into_uuid(), vec![event]).await;
        }
        Ok(settled.result)
    }

    /// Suggest a reason category for a description.
    pub async fn suggest_reason(&self, ctx: &RequestContext, description: &str) -> AppResult<ReasonSuggestion> {
        if !self.flags.reason_suggestions {
            return Err(AppError::validation("Reason suggestions are disabled"));
        }
        self.workspace.authorize(ctx, Action::Create, None)?;
        self.service.suggest_reason(description).await
    }

    /// Audit trail of a variation, newest first.
    pub async fn audit_trail(
        &self,
        ctx: &RequestContext,
        id: VariationId,
        force_refresh: bool,
    ) -> AppResult<Vec<AuditEntry>> {
        self.workspace.audit_trail(ctx, id, force_refresh).await
    }

    /// Cancel all timers owned by the workspace.
    pub fn shutdown(&self) {
        self.workspace.shutdown();
    }
}

/// Optimistic record shown while the server allocates the real one.
fn draft_from_form(scope: ProjectId, form: &VariationForm, ctx: &RequestContext) -> Variation {
    let now = Utc::now();
    Variation {
        id: VariationId::new(),
        project_id: scope,
        variation_number: String::new(),
        title: form.title.trim().to_string(),
        description: form.description.clone(),
        status: VariationStatus::Draft,
        cost_impact: form.cost_impact,
        time_impact_days: form.time_impact_days,
        reason: form.reason.clone(),
        client_name: form.client_name.clone(),
        client_email: form.client_email.clone(),
        cost_breakdown: form.cost_breakdown.clone(),
        attachments: Vec::new(),
        email_sent: false,
        email_sent_at: None,
        created_by: Some(ctx.user_id),
        updated_by: Some(ctx.user_id),
        created_at: now,
        updated_at: now,
    }
}
