use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps sent emails in memory instead of delivering them.
///
/// Used by tests and by local runs without an SMTP server. Clones share the
/// same outbox.
#[derive(Debug, Clone, Default)]
pub struct RecordingProvider {
    outbox: Arc<RwLock<Vec<EmailContent>>>,
    fail_with: Option<String>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every send fails with `reason`, after recording the attempt
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail_with: Some(reason.into()),
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<EmailContent> {
        self.outbox.read().await.clone()
    }

    pub async fn clear(&self) {
        self.outbox.write().await.clear();
    }
}

#[async_trait]
impl EmailProvider for RecordingProvider {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail> {
        let mut outbox = self.outbox.write().await;
        outbox.push(email.clone());

        if let Some(reason) = &self.fail_with {
            return Err(NotificationError::ProviderError(reason.clone()));
        }

        Ok(SentEmail {
            message_id: Some(format!("recorded-{}", outbox.len())),
            accepted: true,
        })
    }

    fn name(&self) -> &'static str {
        "Recording"
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        Ok(self.fail_with.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str) -> EmailContent {
        EmailContent {
            to_email: to.to_string(),
            subject: "Hi".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_records_in_order() {
        let provider = RecordingProvider::new();
        let shared = provider.clone();

        provider.send(&email("a@example.com")).await.unwrap();
        let sent = provider.send(&email("b@example.com")).await.unwrap();

        assert_eq!(sent.message_id.as_deref(), Some("recorded-2"));
        let outbox = shared.sent().await;
        assert_eq!(outbox.len(), 2);
        assert_eq!(outbox[1].to_email, "b@example.com");

        shared.clear().await;
        assert!(provider.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_failing_provider_still_records() {
        let provider = RecordingProvider::failing("relay down");

        let err = provider.send(&email("a@example.com")).await.unwrap_err();

        assert!(err.to_string().contains("relay down"));
        assert_eq!(provider.sent().await.len(), 1);
        assert!(!provider.health_check().await.unwrap());
    }
}
