//! Built-in scheduled jobs.

pub mod health;
pub mod outbox;

use async_trait::async_trait;
use serde_json::Value;

use sitehub_core::result::AppResult;

pub use health::BackendHealthJob;
pub use outbox::OutboxFlushJob;

/// A unit of periodic work.
#[async_trait]
pub trait ScheduledJob: Send + Sync + std::fmt::Debug + 'static {
    /// Job name used in logs.
    fn name(&self) -> &str;

    /// Six-field cron expression (seconds first).
    fn schedule(&self) -> &str;

    /// Run the job once and describe what it did.
    async fn run(&self) -> AppResult<Value>;
}
