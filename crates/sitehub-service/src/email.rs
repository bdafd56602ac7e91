//! Email sender backed by a hosted edge function.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use sitehub_core::config::email::EmailConfig;
use sitehub_core::error::ErrorCode;
use sitehub_core::result::AppResult;
use sitehub_core::traits::backend::BackendClient;
use sitehub_core::traits::email::{EmailMessage, EmailSender};

/// Posts email requests to an edge function and returns once accepted.
#[derive(Debug, Clone)]
pub struct EdgeFunctionEmailSender {
    backend: Arc<dyn BackendClient>,
    function_name: String,
    reply_to: Option<String>,
}

impl EdgeFunctionEmailSender {
    /// Create a sender from the email configuration section.
    pub fn new(backend: Arc<dyn BackendClient>, config: &EmailConfig) -> Self {
        Self {
            backend,
            function_name: config.function_name.clone(),
            reply_to: config.reply_to.clone(),
        }
    }

    /// The edge function requests are posted to.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }
}

#[async_trait]
impl EmailSender for EdgeFunctionEmailSender {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        let payload = json!({
            "to": message.to,
            "toName": message.to_name,
            "template": message.template,
            "fields": message.fields,
            "replyTo": message.reply_to.as_ref().or(self.reply_to.as_ref()),
        });
        debug!(function = %self.function_name, template = %message.template, "Posting email request");
        self.backend
            .invoke(&self.function_name, payload)
            .await
            .map_err(|e| e.with_code(ErrorCode::EmailError))?;
        info!(to = %message.to, template = %message.template, "Email request accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitehub_store::MemoryBackend;

    fn message() -> EmailMessage {
        EmailMessage {
            to: "client@example.com".to_string(),
            to_name: Some("Client".to_string()),
            template: "variation".to_string(),
            fields: json!({"variation_number": "VAR-001"}),
            reply_to: None,
        }
    }

    #[tokio::test]
    async fn test_posts_payload_with_default_reply_to() {
        let backend = Arc::new(MemoryBackend::new());
        let config = EmailConfig {
            reply_to: Some("site@builder.test".to_string()),
            ..Default::default()
        };
        let sender = EdgeFunctionEmailSender::new(backend.clone(), &config);
        sender.send(&message()).await.unwrap();

        let invocations = backend.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, "send-variation-email");
        assert_eq!(invocations[0].1["replyTo"], "site@builder.test");
        assert_eq!(invocations[0].1["fields"]["variation_number"], "VAR-001");
    }

    #[tokio::test]
    async fn test_rejection_carries_email_code() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_next("invoke:send-variation-email", "quota exceeded");
        let sender = EdgeFunctionEmailSender::new(backend, &EmailConfig::default());
        let err = sender.send(&message()).await.unwrap_err();
        assert!(err.has_code(ErrorCode::EmailError));
        assert_eq!(err.message, "quota exceeded");
    }
}
