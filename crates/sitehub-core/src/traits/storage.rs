//! Object storage trait for attachments.

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Trait for attachment storage backends.
///
/// Implementations exist for the hosted storage bucket and the local
/// filesystem. Paths are relative to the provider root.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g. `"bucket"`, `"local"`).
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Write bytes to the given path, replacing nothing (paths are unique).
    async fn write(&self, path: &str, data: Bytes, content_type: Option<&str>) -> AppResult<()>;

    /// Delete the object at the given path.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Check whether an object exists at the given path.
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// Public URL under which the object is served.
    fn public_url(&self, path: &str) -> String;
}
