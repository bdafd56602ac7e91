//! Shared fixtures for the SiteHub integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sitehub::AppState;
use sitehub_core::config::AppConfig;
use sitehub_core::types::{ProjectId, UserId};
use sitehub_entity::{CostLine, Role, VariationForm};
use sitehub_service::RequestContext;
use sitehub_storage::LocalStorageProvider;
use sitehub_store::MemoryBackend;

/// An app wired over the in-memory backend and a temporary storage root.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub backend: Arc<MemoryBackend>,
    pub project: ProjectId,
    _storage_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let storage_dir = tempfile::tempdir().expect("temp dir");
        let storage = LocalStorageProvider::new(
            storage_dir.path().to_str().expect("utf-8 path"),
            "http://files.test",
        )
        .await
        .expect("local storage");
        let backend = Arc::new(MemoryBackend::new());
        let state = AppState::with_backend(config, backend.clone(), Arc::new(storage));
        Self {
            state: Arc::new(state),
            backend,
            project: ProjectId::new(),
            _storage_dir: storage_dir,
        }
    }

    /// Sign in a fresh user holding `role`.
    pub fn sign_in(&self, name: &str, role: Role) -> RequestContext {
        let ctx = RequestContext::new(UserId::new(), name, vec![role]);
        self.state.sign_in(ctx.clone());
        ctx
    }

    /// Number of audit rows written for `action`.
    pub fn audit_rows(&self, action: &str) -> Vec<serde_json::Value> {
        self.backend
            .rows("audit_log")
            .into_iter()
            .filter(|row| row["action_type"] == action)
            .collect()
    }
}

pub fn form(title: &str) -> VariationForm {
    VariationForm {
        title: title.to_string(),
        description: Some("Rock encountered at footing F4".to_string()),
        cost_impact: 4800.0,
        time_impact_days: 2,
        client_name: Some("Harbour Developments".to_string()),
        client_email: Some("pm@harbour.test".to_string()),
        cost_breakdown: vec![
            CostLine::new("Rock breaking", 8.0, 450.0),
            CostLine::new("Disposal", 4.0, 300.0),
        ],
        ..Default::default()
    }
}
