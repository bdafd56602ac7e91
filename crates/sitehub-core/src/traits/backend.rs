//! Hosted backend trait: tables, RPC functions and edge functions.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::result::AppResult;
use crate::types::query::Query;

/// Row-oriented access to the hosted backend.
///
/// Rows travel as JSON objects; typed mapping happens one layer up in
/// the table repositories. Implementations report transport and server
/// failures as [`crate::ErrorKind::Remote`] and missing rows as
/// [`crate::ErrorKind::NotFound`].
#[async_trait]
pub trait BackendClient: Send + Sync + std::fmt::Debug + 'static {
    /// Return the backend type name (e.g. `"rest"`, `"memory"`).
    fn backend_type(&self) -> &str;

    /// Read rows from a table.
    async fn select(&self, table: &str, query: &Query) -> AppResult<Vec<Value>>;

    /// Insert a row and return it as stored (server-assigned fields filled in).
    async fn insert(&self, table: &str, row: Value) -> AppResult<Value>;

    /// Apply a partial update to the row with the given id and return the stored row.
    async fn update(&self, table: &str, id: Uuid, patch: Value) -> AppResult<Value>;

    /// Delete the row with the given id.
    async fn delete(&self, table: &str, id: Uuid) -> AppResult<()>;

    /// Call a database function by name.
    async fn rpc(&self, function: &str, params: Value) -> AppResult<Value>;

    /// Invoke an edge function by name.
    async fn invoke(&self, function: &str, payload: Value) -> AppResult<Value>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
