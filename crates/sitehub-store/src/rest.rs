//! HTTP client for the hosted REST gateway, RPC endpoint and edge functions.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use sitehub_core::config::backend::BackendConfig;
use sitehub_core::error::{AppError, ErrorKind};
use sitehub_core::result::AppResult;
use sitehub_core::traits::backend::BackendClient;
use sitehub_core::types::query::Query;

const API_KEY: HeaderName = HeaderName::from_static("apikey");
const PREFER: HeaderName = HeaderName::from_static("prefer");
const ACCEPT_PROFILE: HeaderName = HeaderName::from_static("accept-profile");
const CONTENT_PROFILE: HeaderName = HeaderName::from_static("content-profile");

/// Backend client speaking the hosted gateway's HTTP protocol.
#[derive(Debug)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: Url,
    anon_key: String,
    schema: String,
    access_token: RwLock<Option<String>>,
}

impl RestBackend {
    /// Build a client from configuration.
    pub fn new(config: &BackendConfig) -> AppResult<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| {
            AppError::configuration(format!("Invalid backend url '{}': {e}", config.url))
        })?;
        if config.anon_key.is_empty() {
            return Err(AppError::configuration("backend.anon_key is required"));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            anon_key: config.anon_key.clone(),
            schema: config.schema.clone(),
            access_token: RwLock::new(None),
        })
    }

    /// Use the signed-in user's token instead of the anonymous key.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::configuration(format!("Invalid endpoint '{path}': {e}")))
    }

    fn headers(&self) -> AppResult<HeaderMap> {
        let bearer = self
            .access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY, header_value(&self.anon_key)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {bearer}"))?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_PROFILE, header_value(&self.schema)?);
        headers.insert(CONTENT_PROFILE, header_value(&self.schema)?);
        Ok(headers)
    }

    fn table_url(&self, table: &str) -> AppResult<Url> {
        self.endpoint(&format!("rest/v1/{table}"))
    }

    fn row_url(&self, table: &str, id: Uuid) -> AppResult<Url> {
        let mut url = self.table_url(table)?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Option<Value>) -> AppResult<Value> {
        let mut headers = self.headers()?;
        if matches!(method, Method::POST | Method::PATCH | Method::DELETE) {
            headers.insert(PREFER, HeaderValue::from_static("return=representation"));
        }
        debug!(%method, %url, "Backend request");

        let mut request = self.client.request(method, url.clone()).headers(headers);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::timeout(format!("Backend request timed out: {url}"))
            } else {
                AppError::with_source(ErrorKind::Remote, format!("Backend unreachable: {e}"), e)
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Remote, "Failed to read response", e))?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn header_value(value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::configuration(format!("Invalid header value: {e}")))
}

/// Map a non-success response to an application error.
fn status_error(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("Backend returned {status}"));
    match status {
        StatusCode::NOT_FOUND => AppError::not_found(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::forbidden(message),
        StatusCode::CONFLICT => AppError::conflict(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => AppError::timeout(message),
        _ => {
            warn!(%status, %message, "Backend request failed");
            AppError::remote(message)
        }
    }
}

/// First row of a representation response.
fn first_row(value: Value, what: &str) -> AppResult<Value> {
    match value {
        Value::Array(rows) => rows
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("{what} returned no rows"))),
        Value::Object(_) => Ok(value),
        _ => Err(AppError::remote(format!("{what} returned an unexpected body"))),
    }
}

#[async_trait]
impl BackendClient for RestBackend {
    fn backend_type(&self) -> &str {
        "rest"
    }

    async fn select(&self, table: &str, query: &Query) -> AppResult<Vec<Value>> {
        let mut url = self.table_url(table)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for filter in &query.filters {
                pairs.append_pair(&filter.field, &filter.gateway_value());
            }
            if let Some(order) = &query.order {
                pairs.append_pair("order", &order.gateway_value());
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        match self.send(Method::GET, url, None).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            _ => Err(AppError::remote(format!("Select on {table} returned a non-array body"))),
        }
    }

    async fn insert(&self, table: &str, row: Value) -> AppResult<Value> {
        let url = self.table_url(table)?;
        let body = self.send(Method::POST, url, Some(row)).await?;
        first_row(body, &format!("Insert into {table}"))
    }

    async fn update(&self, table: &str, id: Uuid, patch: Value) -> AppResult<Value> {
        let url = self.row_url(table, id)?;
        let body = self.send(Method::PATCH, url, Some(patch)).await?;
        first_row(body, &format!("Update of {table} row {id}"))
    }

    async fn delete(&self, table: &str, id: Uuid) -> AppResult<()> {
        let url = self.row_url(table, id)?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }

    async fn rpc(&self, function: &str, params: Value) -> AppResult<Value> {
        let url = self.endpoint(&format!("rest/v1/rpc/{function}"))?;
        self.send(Method::POST, url, Some(params)).await
    }

    async fn invoke(&self, function: &str, payload: Value) -> AppResult<Value> {
        let url = self.endpoint(&format!("functions/v1/{function}"))?;
        self.send(Method::POST, url, Some(payload)).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        let url = self.endpoint("rest/v1/")?;
        let headers = self.headers()?;
        match self.client.get(url).headers(headers).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                warn!(error = %e, "Backend health check failed");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackendConfig {
        BackendConfig {
            provider: "rest".to_string(),
            url: "https://example.test/".to_string(),
            anon_key: "anon".to_string(),
            ..BackendConfig::default()
        }
    }

    #[test]
    fn test_requires_anon_key() {
        let mut cfg = config();
        cfg.anon_key.clear();
        let err = RestBackend::new(&cfg).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_row_url_filters_on_id() {
        let backend = RestBackend::new(&config()).unwrap();
        let id = Uuid::nil();
        let url = backend.row_url("variations", id).unwrap();
        assert_eq!(url.path(), "/rest/v1/variations");
        assert_eq!(url.query(), Some(&*format!("id=eq.{id}")));
    }

    #[test]
    fn test_headers_switch_to_access_token() {
        let backend = RestBackend::new(&config()).unwrap();
        let headers = backend.headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer anon");
        assert_eq!(headers.get(ACCEPT_PROFILE).unwrap(), "public");

        backend.set_access_token(Some("user-jwt".to_string()));
        let headers = backend.headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer user-jwt");
        assert_eq!(headers.get(API_KEY).unwrap(), "anon");
    }

    #[test]
    fn test_status_mapping() {
        let err = status_error(StatusCode::FORBIDDEN, r#"{"message":"RLS violation"}"#);
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert_eq!(err.message, "RLS violation");

        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, "oops");
        assert_eq!(err.kind, ErrorKind::Remote);
        assert!(err.message.contains("500"));
    }
}
