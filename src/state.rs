//! Application state shared by every screen of the app.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{info, warn};

use sitehub_auth::PermissionGate;
use sitehub_cache::CacheManager;
use sitehub_core::config::AppConfig;
use sitehub_core::config::features::FeatureFlags;
use sitehub_core::error::AppError;
use sitehub_core::result::AppResult;
use sitehub_core::timer::TimerRegistry;
use sitehub_core::traits::backend::BackendClient;
use sitehub_core::traits::notifier::Notifier;
use sitehub_core::traits::storage::StorageProvider;
use sitehub_core::types::OrganizationId;
use sitehub_entity::{Entity, Module, QaInspection, Task, Variation};
use sitehub_service::{
    AuditOutbox, AuditTrailCache, BroadcastNotifier, EdgeFunctionEmailSender, EntityService,
    EntityWorkspace, FieldDiffLogger, OptimisticEngine, RequestContext, VariationService,
    VariationWorkspace,
};
use sitehub_storage::AttachmentManager;
use sitehub_store::TableRepository;
use sitehub_worker::CronScheduler;
use sitehub_worker::jobs::{BackendHealthJob, OutboxFlushJob};

/// Everything the app needs after start-up.
///
/// Built once by [`AppState::init`] and torn down with
/// [`AppState::shutdown`], which cancels every timer and flushes the
/// audit outbox.
#[derive(Debug)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Feature flags
    pub features: Arc<FeatureFlags>,

    // ── Infrastructure ───────────────────────────────────────
    /// Hosted backend client
    pub backend: Arc<dyn BackendClient>,
    /// Scope listing cache
    pub cache: CacheManager,
    /// Shared timer registry (debounce, cleanup, auto-save)
    pub timers: TimerRegistry,
    /// Toast notifications
    pub notifier: Arc<BroadcastNotifier>,

    // ── Auth & audit ─────────────────────────────────────────
    /// Permission gate
    pub gate: Arc<PermissionGate>,
    /// Queue of audit writes
    pub outbox: Arc<AuditOutbox>,

    // ── Workspaces ───────────────────────────────────────────
    /// Variations
    pub variations: VariationWorkspace,
    /// Tasks
    pub tasks: EntityWorkspace<Task>,
    /// QA inspections
    pub inspections: EntityWorkspace<QaInspection>,

    session: RwLock<Option<RequestContext>>,
    scheduler: tokio::sync::Mutex<Option<CronScheduler>>,
}

impl AppState {
    /// Connect to the configured backend and storage, build every service
    /// and start the scheduled jobs.
    pub async fn init(config: AppConfig) -> AppResult<Self> {
        let backend = sitehub_store::connect(&config.backend)?;
        let storage = sitehub_storage::connect(&config.storage, &config.backend).await?;
        let state = Self::with_backend(config, backend, storage);
        state.start_scheduler().await?;
        info!("SiteHub initialized");
        Ok(state)
    }

    /// Build every service over an existing backend and storage provider.
    ///
    /// No scheduled jobs run until [`start_scheduler`](Self::start_scheduler).
    pub fn with_backend(
        config: AppConfig,
        backend: Arc<dyn BackendClient>,
        storage: Arc<dyn StorageProvider>,
    ) -> Self {
        let config = Arc::new(config);
        let features = Arc::new(config.features.clone());
        let cache = CacheManager::new(&config.cache);
        let timers = TimerRegistry::new();
        let notifier = Arc::new(BroadcastNotifier::default());
        let gate = Arc::new(PermissionGate::new());
        let outbox = Arc::new(AuditOutbox::new(Arc::clone(&backend), config.audit.max_attempts));

        let wiring = Wiring {
            config: &config,
            backend: &backend,
            cache: &cache,
            timers: &timers,
            notifier: &notifier,
            gate: &gate,
            outbox: &outbox,
        };
        let variation_workspace = wiring.workspace::<Variation>(Module::Variations);
        let tasks = wiring.workspace::<Task>(Module::Tasks);
        let inspections = wiring.workspace::<QaInspection>(Module::QaInspections);

        let email = Arc::new(EdgeFunctionEmailSender::new(Arc::clone(&backend), &config.email));
        let variation_service = VariationService::new(
            variation_workspace.service().clone(),
            email,
            AttachmentManager::new(storage),
        );
        let variations = VariationWorkspace::new(variation_workspace, variation_service, Arc::clone(&features));

        info!(backend = backend.backend_type(), "Services wired");
        Self {
            config,
            features,
            backend,
            cache,
            timers,
            notifier,
            gate,
            outbox,
            variations,
            tasks,
            inspections,
            session: RwLock::new(None),
            scheduler: tokio::sync::Mutex::new(None),
        }
    }

    /// Register and start the periodic jobs.
    pub async fn start_scheduler(&self) -> AppResult<()> {
        let mut slot = self.scheduler.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        let scheduler = CronScheduler::new().await?;
        scheduler
            .register(Arc::new(OutboxFlushJob::new(
                Arc::clone(&self.outbox),
                self.config.audit.outbox_flush_cron.clone(),
            )))
            .await?;
        scheduler
            .register(Arc::new(BackendHealthJob::new(Arc::clone(&self.backend))))
            .await?;
        scheduler.start().await?;
        *slot = Some(scheduler);
        Ok(())
    }

    /// Make `ctx` the signed-in user.
    pub fn sign_in(&self, ctx: RequestContext) {
        info!(user_id = %ctx.user_id, roles = ?ctx.roles, "Signed in");
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(ctx);
    }

    /// Clear the signed-in user.
    pub fn sign_out(&self) {
        if let Some(ctx) = self.session.write().unwrap_or_else(|e| e.into_inner()).take() {
            info!(user_id = %ctx.user_id, "Signed out");
        }
    }

    /// Context of the signed-in user.
    pub fn session(&self) -> AppResult<RequestContext> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| AppError::forbidden("Not signed in"))
    }

    /// Switch the signed-in user's organization.
    pub fn select_organization(&self, organization_id: OrganizationId) -> AppResult<RequestContext> {
        let mut session = self.session.write().unwrap_or_else(|e| e.into_inner());
        let ctx = session
            .as_mut()
            .ok_or_else(|| AppError::forbidden("Not signed in"))?;
        ctx.organization_id = Some(organization_id);
        info!(user_id = %ctx.user_id, %organization_id, "Organization selected");
        Ok(ctx.clone())
    }

    /// The currently selected organization.
    pub fn organization(&self) -> Option<OrganizationId> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(|ctx| ctx.organization_id)
    }

    /// Stop scheduled jobs, cancel every timer and write queued audit events.
    pub async fn shutdown(&self) -> AppResult<()> {
        if let Some(scheduler) = self.scheduler.lock().await.take() {
            scheduler.shutdown().await?;
        }
        self.variations.shutdown();
        self.tasks.shutdown();
        self.inspections.shutdown();
        self.timers.cancel_all();

        let report = self.outbox.flush().await;
        if self.outbox.pending() > 0 {
            warn!(pending = self.outbox.pending(), "Audit events left unwritten at shutdown");
        }
        info!(written = report.written, "SiteHub shut down");
        Ok(())
    }
}

/// Shared pieces every entity workspace is built from.
struct Wiring<'a> {
    config: &'a AppConfig,
    backend: &'a Arc<dyn BackendClient>,
    cache: &'a CacheManager,
    timers: &'a TimerRegistry,
    notifier: &'a Arc<BroadcastNotifier>,
    gate: &'a Arc<PermissionGate>,
    outbox: &'a Arc<AuditOutbox>,
}

impl Wiring<'_> {
    fn workspace<T: Entity>(&self, module: Module) -> EntityWorkspace<T> {
        let service = EntityService::new(
            TableRepository::new(Arc::clone(self.backend)),
            self.cache.clone(),
            Duration::from_secs(self.config.cache.default_ttl_seconds),
        );
        let notifier: Arc<dyn Notifier> = self.notifier.clone();
        let engine = OptimisticEngine::new(self.config.optimistic.clone(), notifier, self.timers.clone());
        let trail = AuditTrailCache::new(
            Arc::clone(self.backend),
            T::TABLE,
            self.config.audit.cache_ttl(),
            self.timers.clone(),
        );
        EntityWorkspace::new(
            module,
            Arc::clone(self.gate),
            engine,
            service,
            FieldDiffLogger::new(Arc::clone(self.outbox)),
            trail,
            self.config.audit.debounce(),
        )
        .with_audit(self.config.features.audit_trail)
    }
}
