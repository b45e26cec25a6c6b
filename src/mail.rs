//! Out-of-band delivery of recovery links.
//!
//! The only shipped sender logs the link instead of sending real email.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveryMessage {
    pub to_email: String,
    pub link: String,
}

#[async_trait]
pub trait RecoveryMailer: Send + Sync {
    /// Deliver the link or return an error so the caller can revoke the token.
    async fn send(&self, message: &RecoveryMessage) -> Result<()>;
}

/// Local dev sender that logs the link.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl RecoveryMailer for LogMailer {
    async fn send(&self, message: &RecoveryMessage) -> Result<()> {
        info!(
            to_email = %message.to_email,
            link = %message.link,
            "recovery mail send stub"
        );
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<RecoveryMessage>>,
}

impl MemoryMailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<RecoveryMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn last(&self) -> Option<RecoveryMessage> {
        self.sent.lock().await.last().cloned()
    }
}

#[async_trait]
impl RecoveryMailer for MemoryMailer {
    async fn send(&self, message: &RecoveryMessage) -> Result<()> {
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

/// Build the frontend recovery link included in outbound mail.
#[must_use]
pub fn build_recovery_url(frontend_base_url: &str, token: &str) -> String {
    let base = frontend_base_url.trim_end_matches('/');
    format!("{base}/recovery/{token}")
}

/// Last path segment of a recovery link.
#[must_use]
pub fn token_from_recovery_url(link: &str) -> Option<&str> {
    link.rsplit_once("/recovery/")
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_recovery_url_trims_trailing_slash() {
        assert_eq!(
            build_recovery_url("http://localhost:3000/", "abc"),
            "http://localhost:3000/recovery/abc"
        );
        assert_eq!(
            build_recovery_url("https://app.example.com", "abc"),
            "https://app.example.com/recovery/abc"
        );
    }

    #[test]
    fn token_round_trips_through_link() {
        let link = build_recovery_url("http://localhost:3000", "tok");
        assert_eq!(token_from_recovery_url(&link), Some("tok"));
        assert_eq!(token_from_recovery_url("http://localhost:3000/recovery/"), None);
    }

    #[tokio::test]
    async fn memory_mailer_records_messages() -> Result<()> {
        let mailer = MemoryMailer::new();
        let message = RecoveryMessage {
            to_email: "alice@example.com".to_string(),
            link: "http://localhost:3000/recovery/x".to_string(),
        };
        LogMailer.send(&message).await?;
        mailer.send(&message).await?;
        assert_eq!(mailer.last().await, Some(message));
        assert_eq!(mailer.sent().await.len(), 1);
        Ok(())
    }
}
