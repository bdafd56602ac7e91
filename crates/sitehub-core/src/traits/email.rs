//! Outbound transactional email.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// A templated email request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Recipient address.
    pub to: String,
    /// Recipient display name.
    pub to_name: Option<String>,
    /// Template identifier understood by the sender.
    pub template: String,
    /// Values substituted into the template.
    pub fields: serde_json::Value,
    /// Optional reply-to address.
    pub reply_to: Option<String>,
}

/// Fire-and-forget email sender.
///
/// `Ok(())` means the request was accepted, not that it was delivered.
#[async_trait]
pub trait EmailSender: Send + Sync + std::fmt::Debug + 'static {
    /// Submit a message for delivery.
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;
}
