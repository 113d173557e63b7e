//! Notifier trait definition and shared error types.

use duewatch_core::CompanyAlerts;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// What a channel reports back after a successful delivery.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NotifyReport {
    /// Number of individual alerts covered by the dispatch.
    pub notifications_sent: u32,
}

/// Trait for notification channel implementations.
///
/// A trigger supplies its own recipient list per dispatch, so recipients
/// are an argument rather than channel state.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver an alert digest to the given recipients.
    async fn send(
        &self,
        recipients: &[String],
        companies: &[CompanyAlerts],
    ) -> Result<NotifyReport, NotifyError>;

    /// Human-readable name for this channel (e.g., "email").
    fn channel_name(&self) -> &str;
}
