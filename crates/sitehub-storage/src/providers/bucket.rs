//! Hosted storage bucket provider.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{StatusCode, Url};
use tracing::{debug, warn};

use sitehub_core::config::backend::BackendConfig;
use sitehub_core::config::storage::StorageConfig;
use sitehub_core::error::{AppError, ErrorKind};
use sitehub_core::result::AppResult;
use sitehub_core::traits::storage::StorageProvider;

const API_KEY: HeaderName = HeaderName::from_static("apikey");
const UPSERT: HeaderName = HeaderName::from_static("x-upsert");

/// Storage provider writing to a bucket of the hosted object store.
#[derive(Debug, Clone)]
pub struct BucketStorageProvider {
    client: reqwest::Client,
    base_url: Url,
    bucket: String,
    anon_key: String,
}

impl BucketStorageProvider {
    /// Create a provider for `storage.bucket` on the configured backend.
    pub fn new(storage: &StorageConfig, backend: &BackendConfig) -> AppResult<Self> {
        let base_url = Url::parse(&backend.url).map_err(|e| {
            AppError::configuration(format!("Invalid backend url '{}': {e}", backend.url))
        })?;
        if storage.bucket.is_empty() {
            return Err(AppError::configuration("storage.bucket is required"));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(backend.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            bucket: storage.bucket.clone(),
            anon_key: backend.anon_key.clone(),
        })
    }

    fn object_url(&self, prefix: &str, path: &str) -> AppResult<Url> {
        let relative = format!(
            "storage/v1/object/{prefix}{}/{}",
            self.bucket,
            path.trim_start_matches('/')
        );
        self.base_url
            .join(&relative)
            .map_err(|e| AppError::validation(format!("Invalid storage path '{path}': {e}")))
    }

    fn headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.anon_key)
            .map_err(|e| AppError::configuration(format!("Invalid anon key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.anon_key))
            .map_err(|e| AppError::configuration(format!("Invalid anon key: {e}")))?;
        headers.insert(API_KEY, key);
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }
}

fn request_error(e: reqwest::Error) -> AppError {
    AppError::with_source(ErrorKind::Storage, format!("Storage request failed: {e}"), e)
}

#[async_trait]
impl StorageProvider for BucketStorageProvider {
    fn provider_type(&self) -> &str {
        "bucket"
    }

    async fn health_check(&self) -> AppResult<bool> {
        let url = self
            .base_url
            .join(&format!("storage/v1/bucket/{}", self.bucket))
            .map_err(|e| AppError::configuration(format!("Invalid bucket url: {e}")))?;
        match self.client.get(url).headers(self.headers()?).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!(error = %e, "Storage health check failed");
                Ok(false)
            }
        }
    }

    async fn write(&self, path: &str, data: Bytes, content_type: Option<&str>) -> AppResult<()> {
        let url = self.object_url("", path)?;
        let mut headers = self.headers()?;
        headers.insert(UPSERT, HeaderValue::from_static("false"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type.unwrap_or("application/octet-stream"))
                .map_err(|e| AppError::validation(format!("Invalid content type: {e}")))?,
        );

        let size = data.len();
        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(data)
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::storage(format!(
                "Upload of {path} failed with {status}: {body}"
            )));
        }
        debug!(path, bytes = size, "Uploaded attachment");
        Ok(())
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let url = self.object_url("", path)?;
        let response = self
            .client
            .delete(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(request_error)?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(AppError::not_found(format!("File not found: {path}"))),
            status => Err(AppError::storage(format!(
                "Delete of {path} failed with {status}"
            ))),
        }
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let url = self.object_url("info/", path)?;
        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(request_error)?;
        Ok(response.status().is_success())
    }

    fn public_url(&self, path: &str) -> String {
        self.object_url("public/", path)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> BucketStorageProvider {
        let backend = BackendConfig {
            url: "https://project.test/".to_string(),
            anon_key: "anon".to_string(),
            ..BackendConfig::default()
        };
        BucketStorageProvider::new(&StorageConfig::default(), &backend).unwrap()
    }

    #[test]
    fn test_public_url_layout() {
        assert_eq!(
            provider().public_url("v1/photos/1-ab.jpg"),
            "https://project.test/storage/v1/object/public/variation-attachments/v1/photos/1-ab.jpg"
        );
    }

    #[test]
    fn test_rejects_bad_backend_url() {
        let backend = BackendConfig {
            url: "not a url".to_string(),
            ..BackendConfig::default()
        };
        let err = BucketStorageProvider::new(&StorageConfig::default(), &backend).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
