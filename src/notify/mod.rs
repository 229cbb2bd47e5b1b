//! Notification collaborator
//!
//! Rule actions notify admins, individual users, or the accepted investors
//! of an opportunity. Delivery (email, push, in-app) is external; the core
//! only speaks this contract.

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

/// Error types for notification delivery
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

/// Who a notification is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Audience {
    /// Platform administrators / reviewers
    Admins,
    /// A single user by id
    User { user_id: String },
    /// Every investor with an accepted offer on the opportunity
    AcceptedInvestors { opportunity_id: String },
}

/// One outgoing notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub audience: Audience,
    pub subject: String,
    pub body: String,
}

/// Notification delivery contract
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Notifier that only logs (default for the worker binary)
#[derive(Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        info!(
            audience = ?notification.audience,
            subject = %notification.subject,
            "Notification"
        );
        Ok(())
    }
}

/// Collects notifications in memory (for testing)
#[derive(Default)]
pub struct InMemoryNotifier {
    sent: RwLock<Vec<Notification>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.read().await.clone()
    }
}

#[async_trait::async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent.write().await.push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_notifier_records() {
        let notifier = InMemoryNotifier::new();
        notifier
            .notify(Notification {
                audience: Audience::Admins,
                subject: "hello".to_string(),
                body: "world".to_string(),
            })
            .await
            .unwrap();

        let sent = notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].audience, Audience::Admins);
    }
}
