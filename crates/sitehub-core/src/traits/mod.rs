//! Core traits defined in `sitehub-core` and implemented by other crates.

pub mod backend;
pub mod cache;
pub mod email;
pub mod notifier;
pub mod storage;

pub use backend::BackendClient;
pub use cache::CacheProvider;
pub use email::{EmailMessage, EmailSender};
pub use notifier::{Notification, NotificationLevel, Notifier};
pub use storage::StorageProvider;
