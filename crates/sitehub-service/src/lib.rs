//! # sitehub-service
//!
//! Business logic layer for SiteHub. Provides the remote store adapter for
//! every entity type, the optimistic update engine, the audit pipeline
//! (field diffs, write outbox and trail cache) and the workspaces that put
//! them behind the permission gate.

pub mod audit;
pub mod context;
pub mod email;
pub mod entity;
pub mod form;
pub mod notification;
pub mod optimistic;
pub mod variation;
pub mod workspace;

pub use audit::{AuditOutbox, AuditTrailCache, FieldDiffLogger, FlushReport};
pub use context::RequestContext;
pub use email::EdgeFunctionEmailSender;
pub use entity::EntityService;
pub use form::{AutoSaver, submit_with_timeout};
pub use notification::{BroadcastNotifier, MemoryNotifier};
pub use optimistic::{ActionOptions, Mutation, OptimisticEngine, Settled};
pub use variation::{ReasonSuggestion, VariationService, VariationWorkspace};
pub use workspace::EntityWorkspace;
