//! # sitehub-storage
//!
//! Attachment storage for SiteHub records. Files are written under
//! `{entity_id}/{subfolder}/{timestamp}-{random}.{ext}` either to the hosted
//! storage bucket or to a local directory.

pub mod manager;
pub mod paths;
pub mod providers;

use std::sync::Arc;

use tracing::info;

use sitehub_core::config::backend::BackendConfig;
use sitehub_core::config::storage::StorageConfig;
use sitehub_core::error::AppError;
use sitehub_core::result::AppResult;
use sitehub_core::traits::storage::StorageProvider;

pub use manager::{AttachmentManager, StoredAttachment};
pub use providers::{BucketStorageProvider, LocalStorageProvider};

/// Build the storage provider selected by configuration.
pub async fn connect(
    storage: &StorageConfig,
    backend: &BackendConfig,
) -> AppResult<Arc<dyn StorageProvider>> {
    match storage.provider.as_str() {
        "bucket" => {
            info!(bucket = %storage.bucket, "Initializing bucket storage");
            Ok(Arc::new(BucketStorageProvider::new(storage, backend)?))
        }
        "local" => {
            info!(root = %storage.local_root, "Initializing local storage");
            Ok(Arc::new(
                LocalStorageProvider::new(&storage.local_root, &storage.public_base_url).await?,
            ))
        }
        other => Err(AppError::configuration(format!(
            "Unknown storage provider: '{other}'. Supported: bucket, local"
        ))),
    }
}
