//! Attachment manager: names, uploads and removes record attachments.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use sitehub_core::error::{AppError, ErrorCode, ErrorKind};
use sitehub_core::result::AppResult;
use sitehub_core::traits::storage::StorageProvider;

use crate::paths::{attachment_path, content_type};

/// A stored attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    /// Object path within the provider.
    pub path: String,
    /// Public URL the object is served under.
    pub public_url: String,
}

/// Uploads and deletes attachments through a [`StorageProvider`].
#[derive(Debug, Clone)]
pub struct AttachmentManager {
    provider: Arc<dyn StorageProvider>,
}

impl AttachmentManager {
    /// Create a manager over the given provider.
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    /// Upload `data` under a fresh path for `entity_id`.
    pub async fn upload(
        &self,
        entity_id: Uuid,
        subfolder: &str,
        filename: &str,
        data: Bytes,
    ) -> AppResult<StoredAttachment> {
        if data.is_empty() {
            return Err(AppError::validation("Attachment is empty").with_code(ErrorCode::UploadError));
        }
        let path = attachment_path(entity_id, subfolder, filename, Utc::now());
        self.provider
            .write(&path, data, content_type(&path))
            .await
            .map_err(|e| e.with_code(ErrorCode::UploadError))?;

        let public_url = self.provider.public_url(&path);
        info!(%entity_id, %path, "Attachment uploaded");
        Ok(StoredAttachment { path, public_url })
    }

    /// Delete an attachment by path. A missing object counts as deleted.
    pub async fn delete(&self, path: &str) -> AppResult<()> {
        match self.provider.delete(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind == ErrorKind::NotFound => {
                warn!(path, "Attachment already gone");
                Ok(())
            }
            Err(e) => Err(e.with_code(ErrorCode::AttachmentDeleteError)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::LocalStorageProvider;

    async fn manager(dir: &tempfile::TempDir) -> AttachmentManager {
        let provider = LocalStorageProvider::new(dir.path().to_str().unwrap(), "http://f.test")
            .await
            .unwrap();
        AttachmentManager::new(Arc::new(provider))
    }

    #[tokio::test]
    async fn test_upload_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(&dir).await;
        let entity = Uuid::new_v4();

        let stored = manager
            .upload(entity, "documents", "quote.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        assert!(stored.path.starts_with(&format!("{entity}/documents/")));
        assert!(stored.path.ends_with(".pdf"));
        assert_eq!(stored.public_url, format!("http://f.test/{}", stored.path));
        assert!(manager.provider().exists(&stored.path).await.unwrap());

        manager.delete(&stored.path).await.unwrap();
        assert!(!manager.provider().exists(&stored.path).await.unwrap());
        // Second delete is a no-op.
        manager.delete(&stored.path).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(&dir).await;
        let err = manager
            .upload(Uuid::new_v4(), "documents", "empty.txt", Bytes::new())
            .await
            .unwrap_err();
        assert!(err.has_code(ErrorCode::UploadError));
    }
}
