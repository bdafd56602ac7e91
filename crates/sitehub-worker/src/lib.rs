//! Scheduled background jobs for SiteHub.
//!
//! This crate provides:
//! - A cron scheduler that runs registered jobs on their schedules
//! - The audit outbox flush, which retries audit writes that failed
//!   during a mutation
//! - A backend health check

pub mod jobs;
pub mod scheduler;

pub use jobs::ScheduledJob;
pub use scheduler::CronScheduler;
