//! Variation service: the store adapter plus variation-only operations.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use validator::Validate;

use sitehub_core::error::{AppError, ErrorCode, ErrorKind};
use sitehub_core::result::AppResult;
use sitehub_core::traits::backend::BackendClient;
use sitehub_core::traits::email::{EmailMessage, EmailSender};
use sitehub_core::types::{ProjectId, UserId, VariationId};
use sitehub_entity::{Variation, VariationForm, VariationStatus};
use sitehub_storage::{AttachmentManager, StoredAttachment};
use sitehub_store::functions;

use crate::context::RequestContext;
use crate::entity::EntityService;

/// Folder attachments are stored under, below the variation id.
const ATTACHMENT_FOLDER: &str = "attachments";

/// Email template understood by the email edge function.
const EMAIL_TEMPLATE: &str = "variation";

/// A suggested reason category for a variation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonSuggestion {
    /// Reason category, e.g. `"latent_condition"`.
    pub reason: String,
    /// Classifier confidence between 0 and 1.
    pub confidence: f64,
}

/// Variation reads and writes against the hosted backend.
#[derive(Debug, Clone)]
pub struct VariationService {
    entities: EntityService<Variation>,
    backend: Arc<dyn BackendClient>,
    email: Arc<dyn EmailSender>,
    attachments: AttachmentManager,
}

impl VariationService {
    /// Creates a new variation service.
    pub fn new(
        entities: EntityService<Variation>,
        email: Arc<dyn EmailSender>,
        attachments: AttachmentManager,
    ) -> Self {
        let backend = Arc::clone(entities.repository().backend());
        Self {
            entities,
            backend,
            email,
            attachments,
        }
    }

    /// The generic store adapter for variations.
    pub fn entities(&self) -> &EntityService<Variation> {
        &self.entities
    }

    /// The attachment manager.
    pub fn attachments(&self) -> &AttachmentManager {
        &self.attachments
    }

    /// Variations of a project, newest first.
    pub async fn fetch(&self, scope: ProjectId, force_refresh: bool) -> AppResult<Vec<Variation>> {
        self.entities.fetch(scope, force_refresh).await
    }

    /// A single variation by id.
    pub async fn get(&self, id: VariationId) -> AppResult<Variation> {
        self.entities.get(id).await
    }

    /// Allocate the next variation number of a project.
    pub async fn generate_variation_number(&self, scope: ProjectId) -> AppResult<String> {
        let value = self
            .backend
            .rpc(
                functions::GENERATE_VARIATION_NUMBER,
                json!({ "p_project_id": scope }),
            )
            .await
            .map_err(|e| e.with_code(ErrorCode::SequenceError))?;
        match value {
            Value::String(number) if !number.is_empty() => Ok(number),
            other => Err(AppError::remote(format!(
                "Unexpected variation number response: {other}"
            ))
            .with_code(ErrorCode::SequenceError)),
        }
    }

    /// Validate `form` and insert it as a draft with a fresh number.
    pub async fn create(&self, scope: ProjectId, form: &VariationForm, user_id: UserId) -> AppResult<Variation> {
        validate_form(form)?;
        let number = self.generate_variation_number(scope).await?;
        let row = json!({
            "variation_number": number,
            "title": form.title.trim(),
            "description": form.description,
            "status": VariationStatus::Draft,
            "cost_impact": form.cost_impact,
            "time_impact_days": form.time_impact_days,
            "reason": form.reason,
            "client_name": form.client_name,
            "client_email": form.client_email,
            "cost_breakdown": form.cost_breakdown,
            "attachments": [],
            "email_sent": false,
        });
        let created = self.entities.create(scope, row, user_id).await?;
        info!(id = %created.id, number = %created.variation_number, "Variation raised");
        Ok(created)
    }

    /// Apply `updates`, stamping `updated_at` and `updated_by`.
    pub async fn update(&self, id: VariationId, updates: Value, user_id: UserId) -> AppResult<Variation> {
        self.entities.update(id, updates, user_id).await
    }

    /// Delete a variation of `scope`.
    pub async fn delete(&self, id: VariationId, scope: ProjectId) -> AppResult<()> {
        self.entities.delete(id, scope).await
    }

    /// Email the variation to its client and stamp `email_sent`.
    ///
    /// The email request is fire-and-forget: acceptance by the sender is
    /// treated as sent.
    pub async fn send_email(&self, id: VariationId, ctx: &RequestContext) -> AppResult<Variation> {
        let variation = self.get(id).await?;
        let to = match variation.client_email.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => {
                return Err(AppError::validation(format!(
                    "Variation {} has no client email",
                    variation.variation_number
                ))
                .with_code(ErrorCode::MissingClientEmail));
            }
        };

        let message = EmailMessage {
            to,
            to_name: variation.client_name.clone(),
            template: EMAIL_TEMPLATE.to_string(),
            fields: json!({
                "variation_id": variation.id,
                "variation_number": variation.variation_number,
                "title": variation.title,
                "description": variation.description,
                "cost_impact": variation.cost_impact,
                "time_impact_days": variation.time_impact_days,
                "status": variation.status,
                "sent_by": ctx.user_name,
            }),
            reply_to: None,
        };
        self.email
            .send(&message)
            .await
            .map_err(|e| e.with_code(ErrorCode::EmailError))?;

        self.update(
            id,
            json!({ "email_sent": true, "email_sent_at": Utc::now() }),
            ctx.user_id,
        )
        .await
    }

    /// Upload a file and append its path to the variation's attachments.
    ///
    /// If recording the path fails the uploaded object is removed again.
    pub async fn add_attachment(
        &self,
        id: VariationId,
        filename: &str,
        data: Bytes,
        user_id: UserId,
    ) -> AppResult<(Variation, StoredAttachment)> {
        let variation = self.get(id).await?;
        let stored = self
            .attachments
            .upload(id.into_uuid(), ATTACHMENT_FOLDER, filename, data)
            .await?;

        let mut paths = variation.attachments;
        paths.push(stored.path.clone());
        match self.update(id, json!({ "attachments": paths }), user_id).await {
            Ok(updated) => Ok((updated, stored)),
            Err(e) => {
                if let Err(cleanup) = self.attachments.delete(&stored.path).await {
                    warn!(path = %stored.path, error = %cleanup, "Orphaned attachment left in storage");
                }
                Err(e.with_code(ErrorCode::UploadError))
            }
        }
    }

    /// Remove an attachment from storage and from the variation.
    pub async fn remove_attachment(&self, id: VariationId, path: &str, user_id: UserId) -> AppResult<Variation> {
        let variation = self.get(id).await?;
        if !variation.attachments.iter().any(|p| p == path) {
            return Err(AppError::not_found(format!("Attachment '{path}' is not on this variation"))
                .with_code(ErrorCode::AttachmentDeleteError));
        }
        self.attachments.delete(path).await?;

        let paths: Vec<String> = variation
            .attachments
            .into_iter()
            .filter(|p| p != path)
            .collect();
        self.update(id, json!({ "attachments": paths }), user_id)
            .await
            .map_err(|e| e.with_code(ErrorCode::AttachmentDeleteError))
    }

    /// Ask the classification helper for a reason category.
    pub async fn suggest_reason(&self, description: &str) -> AppResult<ReasonSuggestion> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::validation("A description is required to suggest a reason")
                .with_code(ErrorCode::SuggestionError));
        }
        let value = self
            .backend
            .rpc(
                functions::SUGGEST_VARIATION_REASON,
                json!({ "p_description": description }),
            )
            .await
            .map_err(|e| e.with_code(ErrorCode::SuggestionError))?;
        serde_json::from_value(value).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("Malformed reason suggestion: {e}"),
                e,
            )
            .with_code(ErrorCode::SuggestionError)
        })
    }
}

/// Run the form's validation rules, reporting every failing field.
pub(crate) fn validate_form(form: &VariationForm) -> AppResult<()> {
    if form.title.trim().is_empty() {
        return Err(AppError::validation("Title is required").with_code(ErrorCode::CreateError));
    }
    form.validate().map_err(|errors| {
        let field_errors = errors.field_errors();
        let mut fields: Vec<&str> = field_errors.keys().map(|k| k.as_ref()).collect();
        fields.sort_unstable();
        AppError::validation(format!("Invalid variation: {}", fields.join(", ")))
            .with_code(ErrorCode::CreateError)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use sitehub_cache::CacheManager;
    use sitehub_core::config::cache::CacheConfig;
    use sitehub_entity::{CostLine, Role};
    use sitehub_storage::LocalStorageProvider;
    use sitehub_store::{MemoryBackend, TableRepository};

    use crate::email::EdgeFunctionEmailSender;

    async fn service(dir: &tempfile::TempDir) -> (Arc<MemoryBackend>, VariationService) {
        let backend = Arc::new(MemoryBackend::new());
        let client: Arc<dyn BackendClient> = backend.clone();
        let entities = EntityService::new(
            TableRepository::new(client.clone()),
            CacheManager::new(&CacheConfig::default()),
            Duration::from_secs(300),
        );
        let email = Arc::new(EdgeFunctionEmailSender::new(client, &Default::default()));
        let provider = LocalStorageProvider::new(dir.path().to_str().unwrap(), "http://files.test")
            .await
            .unwrap();
        let attachments = AttachmentManager::new(Arc::new(provider));
        (backend, VariationService::new(entities, email, attachments))
    }

    fn form(title: &str) -> VariationForm {
        VariationForm {
            title: title.to_string(),
            cost_impact: 1200.0,
            client_name: Some("Harbour Developments".to_string()),
            client_email: Some("pm@harbour.test".to_string()),
            cost_breakdown: vec![CostLine::new("Rock breaking", 6.0, 200.0)],
            ..Default::default()
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(UserId::new(), "Sam", vec![Role::ProjectManager])
    }

    #[tokio::test]
    async fn test_create_numbers_and_drafts() {
        let dir = tempfile::tempdir().unwrap();
        let (_, service) = service(&dir).await;
        let project = ProjectId::new();
        let user = UserId::new();

        let first = service.create(project, &form("Rock in footing"), user).await.unwrap();
        let second = service.create(project, &form("Extra pit"), user).await.unwrap();
        assert_eq!(first.variation_number, "VAR-001");
        assert_eq!(second.variation_number, "VAR-002");
        assert_eq!(first.status, VariationStatus::Draft);
        assert_eq!(first.created_by, Some(user));
        assert_eq!(first.breakdown_total(), 1200.0);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_form_before_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, service) = service(&dir).await;
        let mut bad = form("  ");
        bad.client_email = Some("nope".to_string());
        let err = service.create(ProjectId::new(), &bad, UserId::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.has_code(ErrorCode::CreateError));
        assert_eq!(backend.call_count("rpc:generate_variation_number"), 0);
    }

    #[tokio::test]
    async fn test_sequence_failure_has_code() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, service) = service(&dir).await;
        backend.fail_next("rpc:generate_variation_number", "sequence locked");
        let err = service
            .create(ProjectId::new(), &form("Rock"), UserId::new())
            .await
            .unwrap_err();
        assert!(err.has_code(ErrorCode::SequenceError));
        assert_eq!(backend.call_count("insert:variations"), 0);
    }

    #[tokio::test]
    async fn test_send_email_stamps_record() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, service) = service(&dir).await;
        let created = service
            .create(ProjectId::new(), &form("Rock"), UserId::new())
            .await
            .unwrap();

        let sent = service.send_email(created.id, &ctx()).await.unwrap();
        assert!(sent.email_sent);
        assert!(sent.email_sent_at.is_some());
        let invocations = backend.invocations();
        assert_eq!(invocations[0].1["to"], "pm@harbour.test");
        assert_eq!(invocations[0].1["fields"]["sent_by"], "Sam");
    }

    #[tokio::test]
    async fn test_send_email_requires_client_address() {
        let dir = tempfile::tempdir().unwrap();
        let (backend, service) = service(&dir).await;
        let mut no_email = form("Rock");
        no_email.client_email = None;
        let created = service.create(ProjectId::new(), &no_email, UserId::new()).await.unwrap();

        let err = service.send_email(created.id, &ctx()).await.unwrap_err();
        assert!(err.has_code(ErrorCode::MissingClientEmail));
        assert!(backend.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_attachments_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let (_, service) = service(&dir).await;
        let user = UserId::new();
        let created = service.create(ProjectId::new(), &form("Rock"), user).await.unwrap();

        let (updated, stored) = service
            .add_attachment(created.id, "Photo.JPG", Bytes::from_static(b"jpeg"), user)
            .await
            .unwrap();
        assert_eq!(updated.attachments, vec![stored.path.clone()]);
        assert!(stored.path.ends_with(".jpg"));
        assert!(stored.public_url.starts_with("http://files.test/"));

        let removed = service
            .remove_attachment(created.id, &stored.path, user)
            .await
            .unwrap();
        assert!(removed.attachments.is_empty());

        let err = service
            .remove_attachment(created.id, &stored.path, user)
            .await
            .unwrap_err();
        assert!(err.has_code(ErrorCode::AttachmentDeleteError));
    }

    #[tokio::test]
    async fn test_suggest_reason() {
        let dir = tempfile::tempdir().unwrap();
        let (_, service) = service(&dir).await;
        let suggestion = service
            .suggest_reason("Unexpected rock encountered in footing excavation")
            .await
            .unwrap();
        assert_eq!(suggestion.reason, "latent_condition");
        assert!(service.suggest_reason("   ").await.is_err());
    }
}
