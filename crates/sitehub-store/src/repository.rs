//! Typed access to one hosted table.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use sitehub_core::error::{AppError, ErrorCode, ErrorKind};
use sitehub_core::result::AppResult;
use sitehub_core::traits::backend::BackendClient;
use sitehub_core::types::ProjectId;
use sitehub_core::types::query::{Filter, Query};
use sitehub_entity::Entity;

/// Repository mapping rows of `T::TABLE` to `T`.
///
/// Every failure carries the [`ErrorCode`] of the operation that failed.
#[derive(Debug)]
pub struct TableRepository<T: Entity> {
    backend: Arc<dyn BackendClient>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for TableRepository<T> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> TableRepository<T> {
    /// Create a repository over the given backend.
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self {
            backend,
            _marker: PhantomData,
        }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn BackendClient> {
        &self.backend
    }

    /// All rows of a project, newest first.
    pub async fn select_scope(&self, scope: ProjectId) -> AppResult<Vec<T>> {
        let query = Query::scoped(T::SCOPE_FIELD, scope.to_string());
        let rows = self
            .backend
            .select(T::TABLE, &query)
            .await
            .map_err(|e| e.with_code(ErrorCode::FetchError))?;
        debug!(table = T::TABLE, scope = %scope, count = rows.len(), "Fetched rows");
        rows.into_iter()
            .map(|row| decode(row, ErrorCode::FetchError))
            .collect()
    }

    /// A single row by id.
    pub async fn find_by_id(&self, id: T::Id) -> AppResult<T> {
        let query = Query::new().filter(Filter::eq("id", id.to_string())).limit(1);
        let row = self
            .backend
            .select(T::TABLE, &query)
            .await
            .map_err(|e| e.with_code(ErrorCode::FetchError))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::not_found(format!("{} {id} not found", T::LABEL))
                    .with_code(ErrorCode::FetchError)
            })?;
        decode(row, ErrorCode::FetchError)
    }

    /// Insert a record and return the stored row.
    pub async fn insert(&self, row: Value) -> AppResult<T> {
        let stored = self
            .backend
            .insert(T::TABLE, row)
            .await
            .map_err(|e| e.with_code(ErrorCode::CreateError))?;
        decode(stored, ErrorCode::CreateError)
    }

    /// Apply a partial update and return the stored row.
    pub async fn update(&self, id: T::Id, patch: Value) -> AppResult<T> {
        let stored = self
            .backend
            .update(T::TABLE, id.into(), patch)
            .await
            .map_err(|e| e.with_code(ErrorCode::UpdateError))?;
        decode(stored, ErrorCode::UpdateError)
    }

    /// Delete a record.
    pub async fn delete(&self, id: T::Id) -> AppResult<()> {
        self.backend
            .delete(T::TABLE, id.into())
            .await
            .map_err(|e| e.with_code(ErrorCode::DeleteError))
    }
}

fn decode<T: Entity>(row: Value, code: ErrorCode) -> AppResult<T> {
    serde_json::from_value(row).map_err(|e| {
        AppError::with_source(
            ErrorKind::Serialization,
            format!("Malformed {} row: {e}", T::LABEL),
            e,
        )
        .with_code(code)
    })
}
