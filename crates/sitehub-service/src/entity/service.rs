//! Remote store adapter for one entity type.

use std::time::Duration;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use sitehub_cache::{CacheManager, keys};
use sitehub_core::error::{AppError, ErrorCode};
use sitehub_core::result::AppResult;
use sitehub_core::traits::cache::CacheProvider;
use sitehub_core::types::{ProjectId, UserId};
use sitehub_entity::Entity;
use sitehub_store::TableRepository;

/// Reads and writes `T` rows, caching scope listings.
///
/// The listing cache is separate from the optimistic engine's collection
/// and is invalidated after every write to the scope.
#[derive(Debug)]
pub struct EntityService<T: Entity> {
    /// Typed table access.
    repo: TableRepository<T>,
    /// Scope listing cache.
    cache: CacheManager,
    /// Lifetime of a cached listing.
    ttl: Duration,
}

impl<T: Entity> Clone for EntityService<T> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            cache: self.cache.clone(),
            ttl: self.ttl,
        }
    }
}

impl<T: Entity> EntityService<T> {
    /// Creates a new entity service.
    pub fn new(repo: TableRepository<T>, cache: CacheManager, ttl: Duration) -> Self {
        Self { repo, cache, ttl }
    }

    /// The underlying repository.
    pub fn repository(&self) -> &TableRepository<T> {
        &self.repo
    }

    /// All records of a scope, newest first.
    ///
    /// A cached listing younger than the TTL is returned unless
    /// `force_refresh` is set.
    pub async fn fetch(&self, scope: ProjectId, force_refresh: bool) -> AppResult<Vec<T>> {
        let key = keys::scoped_rows(T::TABLE, scope.into_uuid());
        if !force_refresh {
            match self.cache.get_json::<Vec<T>>(&key).await {
                Ok(Some(rows)) => {
                    debug!(table = T::TABLE, scope = %scope, "Listing cache hit");
                    return Ok(rows);
                }
                Ok(None) => {}
                Err(e) => warn!(table = T::TABLE, error = %e, "Listing cache read failed"),
            }
        }

        let rows = self.repo.select_scope(scope).await?;
        if let Err(e) = self.cache.set_json(&key, &rows, self.ttl).await {
            warn!(table = T::TABLE, error = %e, "Listing cache write failed");
        }
        Ok(rows)
    }

    /// A single record by id, always from the backend.
    pub async fn get(&self, id: T::Id) -> AppResult<T> {
        self.repo.find_by_id(id).await
    }

    /// Insert `row` into `scope`, stamping the scope and creator columns.
    pub async fn create(&self, scope: ProjectId, row: Value, user_id: UserId) -> AppResult<T> {
        let Value::Object(mut object) = row else {
            return Err(AppError::validation(format!("{} payload must be an object", T::LABEL))
                .with_code(ErrorCode::CreateError));
        };
        object.insert(T::SCOPE_FIELD.to_string(), json!(scope));
        for field in [T::CREATED_BY_FIELD, T::UPDATED_BY_FIELD].into_iter().flatten() {
            object.entry(field.to_string()).or_insert_with(|| json!(user_id));
        }

        let created = self.repo.insert(Value::Object(object)).await?;
        info!(table = T::TABLE, id = %created.id(), scope = %scope, "Record created");
        self.invalidate(scope).await;
        Ok(created)
    }

    /// Apply `updates` to a record, stamping `updated_at` and the editor column.
    pub async fn update(&self, id: T::Id, updates: Value, user_id: UserId) -> AppResult<T> {
        let Value::Object(mut patch) = updates else {
            return Err(AppError::validation(format!("{} update must be an object", T::LABEL))
                .with_code(ErrorCode::UpdateError));
        };
        patch.insert("updated_at".to_string(), json!(Utc::now()));
        if let Some(field) = T::UPDATED_BY_FIELD {
            patch.insert(field.to_string(), json!(user_id));
        }

        let updated = self.repo.update(id, Value::Object(patch)).await?;
        info!(table = T::TABLE, id = %id, "Record updated");
        self.invalidate(updated.scope_id()).await;
        Ok(updated)
    }

    /// Delete a record of `scope`.
    pub async fn delete(&self, id: T::Id, scope: ProjectId) -> AppResult<()> {
        self.repo.delete(id).await?;
        info!(table = T::TABLE, id = %id, "Record deleted");
        self.invalidate(scope).await;
        Ok(())
    }

    /// Drop the cached listing of `scope`.
    pub async fn invalidate(&self, scope: ProjectId) {
        let key = keys::scoped_rows(T::TABLE, scope.into_uuid());
        if let Err(e) = self.cache.delete(&key).await {
            warn!(table = T::TABLE, error = %e, "Listing cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sitehub_core::config::cache::CacheConfig;
    use sitehub_core::traits::backend::BackendClient;
    use sitehub_entity::{Task, TaskStatus};
    use sitehub_store::MemoryBackend;

    fn service() -> (Arc<MemoryBackend>, EntityService<Task>) {
        let backend = Arc::new(MemoryBackend::new());
        let repo = TableRepository::new(backend.clone() as Arc<dyn BackendClient>);
        let cache = CacheManager::new(&CacheConfig::default());
        (backend, EntityService::new(repo, cache, Duration::from_secs(300)))
    }

    #[tokio::test]
    async fn test_fetch_uses_cache_until_forced() {
        let (backend, service) = service();
        let project = ProjectId::new();
        let user = UserId::new();
        service
            .create(project, json!({"title": "Excavate", "status": "todo"}), user)
            .await
            .unwrap();

        let first = service.fetch(project, false).await.unwrap();
        let second = service.fetch(project, false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.call_count("select:tasks"), 1);

        service.fetch(project, true).await.unwrap();
        assert_eq!(backend.call_count("select:tasks"), 2);
    }

    #[tokio::test]
    async fn test_writes_invalidate_scope() {
        let (backend, service) = service();
        let project = ProjectId::new();
        let user = UserId::new();
        let task = service
            .create(project, json!({"title": "Excavate", "status": "todo"}), user)
            .await
            .unwrap();
        assert_eq!(service.fetch(project, false).await.unwrap().len(), 1);

        let updated = service
            .update(task.id, json!({"status": "in_progress"}), user)
            .await
            .unwrap();
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert!(updated.updated_at >= task.updated_at);

        let listed = service.fetch(project, false).await.unwrap();
        assert_eq!(listed[0].status, TaskStatus::InProgress);
        assert_eq!(backend.call_count("select:tasks"), 2);

        service.delete(task.id, project).await.unwrap();
        assert!(service.fetch(project, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failures_carry_codes() {
        let (backend, service) = service();
        backend.fail_next("insert:tasks", "insert rejected");
        let err = service
            .create(ProjectId::new(), json!({"title": "x", "status": "todo"}), UserId::new())
            .await
            .unwrap_err();
        assert!(err.has_code(ErrorCode::CreateError));
        assert_eq!(err.message, "insert rejected");

        let err = service
            .update(Default::default(), json!([]), UserId::new())
            .await
            .unwrap_err();
        assert!(err.has_code(ErrorCode::UpdateError));
    }
}
