//! In-process backend emulating the hosted tables and database functions.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::debug;
use uuid::Uuid;

use sitehub_core::error::AppError;
use sitehub_core::result::AppResult;
use sitehub_core::traits::backend::BackendClient;
use sitehub_core::types::query::{Query, SortField};

use crate::functions;

/// Table holding audit rows written through the audit functions.
const AUDIT_TABLE: &str = "audit_log";

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Value>>,
    calls: HashMap<String, usize>,
    invocations: Vec<(String, Value)>,
    fail_next: HashMap<String, VecDeque<String>>,
    fail_always: HashMap<String, String>,
}

/// Backend that keeps every table in memory.
///
/// Operation keys used for call counting and failure injection are
/// `"{op}:{name}"`, e.g. `"select:variations"`, `"rpc:log_variation_change"`,
/// `"invoke:send-variation-email"`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    latency: Mutex<Duration>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before it touches state.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    /// Make the next call of `operation` fail with `message`.
    pub fn fail_next(&self, operation: &str, message: &str) {
        let mut state = self.lock();
        state
            .fail_next
            .entry(operation.to_string())
            .or_default()
            .push_back(message.to_string());
    }

    /// Make every call of `operation` fail with `message` until cleared.
    pub fn fail_always(&self, operation: &str, message: &str) {
        self.lock()
            .fail_always
            .insert(operation.to_string(), message.to_string());
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.fail_next.clear();
        state.fail_always.clear();
    }

    /// Number of calls made for `operation`.
    pub fn call_count(&self, operation: &str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    /// Edge function invocations in call order.
    pub fn invocations(&self) -> Vec<(String, Value)> {
        self.lock().invocations.clone()
    }

    /// Raw rows of a table.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Insert a row verbatim, bypassing counters and failure injection.
    pub fn seed(&self, table: &str, row: Value) {
        self.lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call, simulate latency and apply injected failures.
    async fn enter(&self, operation: String) -> AppResult<()> {
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        {
            let mut state = self.lock();
            *state.calls.entry(operation.clone()).or_default() += 1;
        }
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        if let Some(message) = state
            .fail_next
            .get_mut(&operation)
            .and_then(|queue| queue.pop_front())
        {
            debug!(%operation, %message, "Injected failure");
            return Err(AppError::remote(message));
        }
        if let Some(message) = state.fail_always.get(&operation) {
            return Err(AppError::remote(message.clone()));
        }
        Ok(())
    }

    fn next_variation_number(&self, params: &Value) -> AppResult<Value> {
        let project_id = params
            .get("p_project_id")
            .cloned()
            .ok_or_else(|| AppError::validation("p_project_id is required"))?;
        let state = self.lock();
        let existing = state
            .tables
            .get("variations")
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get("project_id") == Some(&project_id))
                    .count()
            })
            .unwrap_or(0);
        Ok(Value::String(format!("VAR-{:03}", existing + 1)))
    }

    fn append_audit(&self, params: &Value) -> AppResult<Value> {
        let field = |name: &str| params.get(name).cloned().unwrap_or(Value::Null);
        let entity_id = field("p_entity_id");
        if entity_id.is_null() {
            return Err(AppError::validation("p_entity_id is required"));
        }
        let id = match field("p_event_id") {
            Value::Null => Value::String(Uuid::new_v4().to_string()),
            id => id,
        };
        let timestamp = match field("p_timestamp") {
            Value::Null => json!(Utc::now()),
            ts => ts,
        };
        let row = json!({
            "id": id,
            "entity_type": field("p_entity_type"),
            "entity_id": entity_id,
            "user_id": field("p_user_id"),
            "user_name": field("p_user_name"),
            "action_type": field("p_action_type"),
            "field_name": field("p_field_name"),
            "old_value": field("p_old_value"),
            "new_value": field("p_new_value"),
            "status_from": field("p_status_from"),
            "status_to": field("p_status_to"),
            "comments": field("p_comments"),
            "timestamp": timestamp,
        });

        let mut state = self.lock();
        let rows = state.tables.entry(AUDIT_TABLE.to_string()).or_default();
        // The event id makes retried writes idempotent.
        if !rows.iter().any(|existing| existing.get("id") == row.get("id")) {
            rows.push(row.clone());
        }
        Ok(row)
    }

    fn audit_trail(&self, params: &Value) -> AppResult<Value> {
        let entity_id = params
            .get("p_entity_id")
            .cloned()
            .ok_or_else(|| AppError::validation("p_entity_id is required"))?;
        let state = self.lock();
        let mut rows: Vec<Value> = state
            .tables
            .get(AUDIT_TABLE)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get("entity_id") == Some(&entity_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let order = SortField::desc("timestamp");
        rows.sort_by(|a, b| order.compare(a, b));
        Ok(Value::Array(rows))
    }
}

fn suggest_reason(params: &Value) -> Value {
    let text = params
        .get("p_description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase();
    let rules: [(&[&str], &str); 4] = [
        (&["client", "owner", "requested"], "client_request"),
        (&["design", "drawing", "architect"], "design_change"),
        (&["rock", "ground", "latent", "asbestos"], "latent_condition"),
        (&["council", "regulat", "code", "compliance"], "regulatory"),
    ];
    for (keywords, reason) in rules {
        if keywords.iter().any(|k| text.contains(k)) {
            return json!({ "reason": reason, "confidence": 0.8 });
        }
    }
    json!({ "reason": "other", "confidence": 0.2 })
}

#[async_trait]
impl BackendClient for MemoryBackend {
    fn backend_type(&self) -> &str {
        "memory"
    }

    async fn select(&self, table: &str, query: &Query) -> AppResult<Vec<Value>> {
        self.enter(format!("select:{table}")).await?;
        let state = self.lock();
        let mut rows: Vec<Value> = state
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default();
        if let Some(order) = &query.order {
            rows.sort_by(|a, b| order.compare(a, b));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> AppResult<Value> {
        self.enter(format!("insert:{table}")).await?;
        let Value::Object(mut object) = row else {
            return Err(AppError::validation("Inserted row must be a JSON object"));
        };
        let now = json!(Utc::now());
        object
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        object.entry("created_at").or_insert_with(|| now.clone());
        object.entry("updated_at").or_insert(now);

        let stored = Value::Object(object);
        self.lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, table: &str, id: Uuid, patch: Value) -> AppResult<Value> {
        self.enter(format!("update:{table}")).await?;
        let Value::Object(patch) = patch else {
            return Err(AppError::validation("Update patch must be a JSON object"));
        };
        let key = Value::String(id.to_string());
        let mut state = self.lock();
        let row = state
            .tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row.get("id") == Some(&key)))
            .ok_or_else(|| AppError::not_found(format!("{table} row {id} not found")))?;
        if let Value::Object(object) = row {
            merge_into(object, patch);
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: &str, id: Uuid) -> AppResult<()> {
        self.enter(format!("delete:{table}")).await?;
        let key = Value::String(id.to_string());
        let mut state = self.lock();
        let rows = state
            .tables
            .get_mut(table)
            .ok_or_else(|| AppError::not_found(format!("{table} row {id} not found")))?;
        let before = rows.len();
        rows.retain(|row| row.get("id") != Some(&key));
        if rows.len() == before {
            return Err(AppError::not_found(format!("{table} row {id} not found")));
        }
        Ok(())
    }

    async fn rpc(&self, function: &str, params: Value) -> AppResult<Value> {
        self.enter(format!("rpc:{function}")).await?;
        match function {
            functions::GENERATE_VARIATION_NUMBER => self.next_variation_number(&params),
            functions::SUGGEST_VARIATION_REASON => Ok(suggest_reason(&params)),
            name if name.starts_with("log_") && name.ends_with("_change") => {
                self.append_audit(&params)
            }
            name if name.starts_with("get_") && name.ends_with("_audit_trail") => {
                self.audit_trail(&params)
            }
            other => Err(AppError::not_found(format!("Unknown function: {other}"))),
        }
    }

    async fn invoke(&self, function: &str, payload: Value) -> AppResult<Value> {
        self.enter(format!("invoke:{function}")).await?;
        self.lock()
            .invocations
            .push((function.to_string(), payload));
        Ok(json!({ "success": true }))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

fn merge_into(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitehub_core::error::ErrorKind;
    use sitehub_core::types::query::Filter;

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let backend = MemoryBackend::new();
        let row = backend
            .insert("variations", json!({"title": "A", "project_id": "p1"}))
            .await
            .unwrap();
        assert!(row.get("id").and_then(Value::as_str).is_some());
        assert!(row.get("created_at").is_some());
        assert_eq!(backend.rows("variations").len(), 1);
    }

    #[tokio::test]
    async fn test_select_filters_and_orders() {
        let backend = MemoryBackend::new();
        backend.seed("tasks", json!({"id": "1", "project_id": "p1", "created_at": "2024-01-01T00:00:00Z"}));
        backend.seed("tasks", json!({"id": "2", "project_id": "p1", "created_at": "2024-02-01T00:00:00Z"}));
        backend.seed("tasks", json!({"id": "3", "project_id": "p2", "created_at": "2024-03-01T00:00:00Z"}));

        let rows = backend
            .select("tasks", &Query::scoped("project_id", "p1"))
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);

        let limited = backend
            .select("tasks", &Query::new().filter(Filter::neq("project_id", "p1")).limit(5))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_and_missing_row_is_not_found() {
        let backend = MemoryBackend::new();
        let row = backend
            .insert("variations", json!({"title": "A", "status": "draft"}))
            .await
            .unwrap();
        let id: Uuid = row["id"].as_str().unwrap().parse().unwrap();

        let updated = backend
            .update("variations", id, json!({"status": "pending"}))
            .await
            .unwrap();
        assert_eq!(updated["status"], "pending");
        assert_eq!(updated["title"], "A");

        let err = backend
            .update("variations", Uuid::new_v4(), json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MemoryBackend::new();
        backend.fail_next("select:tasks", "boom");
        let err = backend.select("tasks", &Query::new()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Remote);
        assert_eq!(err.message, "boom");
        assert!(backend.select("tasks", &Query::new()).await.is_ok());
        assert_eq!(backend.call_count("select:tasks"), 2);
    }

    #[tokio::test]
    async fn test_variation_numbers_are_sequential_per_project() {
        let backend = MemoryBackend::new();
        let params = json!({"p_project_id": "p1"});
        let first = backend
            .rpc(functions::GENERATE_VARIATION_NUMBER, params.clone())
            .await
            .unwrap();
        assert_eq!(first, "VAR-001");
        backend
            .insert("variations", json!({"project_id": "p1", "variation_number": "VAR-001"}))
            .await
            .unwrap();
        backend
            .insert("variations", json!({"project_id": "p2", "variation_number": "VAR-001"}))
            .await
            .unwrap();
        let second = backend
            .rpc(functions::GENERATE_VARIATION_NUMBER, params)
            .await
            .unwrap();
        assert_eq!(second, "VAR-002");
    }

    #[tokio::test]
    async fn test_audit_functions_roundtrip_and_dedupe_by_event_id() {
        let backend = MemoryBackend::new();
        let entity = Uuid::new_v4();
        let event_id = Uuid::new_v4();
        let params = json!({
            "p_event_id": event_id,
            "p_entity_type": "variations",
            "p_entity_id": entity,
            "p_action_type": "field_updated",
            "p_field_name": "title",
            "p_old_value": "A",
            "p_new_value": "B",
        });
        backend.rpc("log_variation_change", params.clone()).await.unwrap();
        backend.rpc("log_variation_change", params).await.unwrap();

        let trail = backend
            .rpc("get_variation_audit_trail", json!({"p_entity_id": entity}))
            .await
            .unwrap();
        let rows = trail.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["field_name"], "title");
    }

    #[tokio::test]
    async fn test_suggest_reason() {
        let backend = MemoryBackend::new();
        let result = backend
            .rpc(
                functions::SUGGEST_VARIATION_REASON,
                json!({"p_description": "Rock encountered during excavation"}),
            )
            .await
            .unwrap();
        assert_eq!(result["reason"], "latent_condition");
    }
}
