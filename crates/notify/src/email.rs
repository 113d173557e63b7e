//! SMTP email notifier via `lettre` with TLS support.
//!
//! Delivers the alert digest as a single HTML email to the recipients the
//! firing trigger configured. Uses STARTTLS against the configured relay.

use chrono::Utc;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use duewatch_core::config::SmtpConfig;
use duewatch_core::CompanyAlerts;

use crate::template;
use crate::traits::{Notifier, NotifyError, NotifyReport};

/// Sends alert digests as email via SMTP.
pub struct EmailNotifier {
    /// Async SMTP transport for sending emails.
    transport: AsyncSmtpTransport<Tokio1Executor>,
    /// Sender mailbox.
    from: Mailbox,
}

impl EmailNotifier {
    /// Build an `EmailNotifier` from SMTP configuration.
    ///
    /// Fails with [`NotifyError::Config`] when credentials or the sender
    /// address are missing; the caller treats that as "notifier
    /// unconfigured" and records a failure without attempting delivery.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let (username, password) = match (&config.username, &config.password) {
            (Some(u), Some(p)) => (u.clone(), p.clone()),
            _ => {
                return Err(NotifyError::Config(
                    "SMTP credentials not configured".to_string(),
                ))
            }
        };

        let sender = config
            .sender()
            .ok_or_else(|| NotifyError::Config("no sender address configured".to_string()))?;
        let from: Mailbox = format!("{} <{}>", config.from_name, sender)
            .parse()
            .map_err(|e: lettre::address::AddressError| NotifyError::Config(e.to_string()))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| NotifyError::Config(e.to_string()))?
            .port(config.port)
            .credentials(Credentials::new(username, password))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    /// Send one digest email covering every company's filtered alerts.
    async fn send(
        &self,
        recipients: &[String],
        companies: &[CompanyAlerts],
    ) -> Result<NotifyReport, NotifyError> {
        if recipients.is_empty() {
            return Err(NotifyError::Config("no recipients specified".to_string()));
        }

        let now = Utc::now();
        let html = template::render_digest(companies, now)?;
        let notifications_sent: u32 = companies.iter().map(|c| c.total_alerts() as u32).sum();

        let mut builder = Message::builder().from(self.from.clone());
        for recipient in recipients {
            let mailbox: Mailbox = recipient
                .parse()
                .map_err(|e: lettre::address::AddressError| {
                    NotifyError::Config(format!("invalid recipient '{recipient}': {e}"))
                })?;
            builder = builder.to(mailbox);
        }

        let email = builder
            .subject(format!(
                "Compliance deadline notifications - {}",
                now.format("%d/%m/%Y")
            ))
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            recipients = recipients.len(),
            notifications = notifications_sent,
            "notification digest delivered"
        );

        Ok(NotifyReport { notifications_sent })
    }

    /// Returns `"email"`.
    fn channel_name(&self) -> &str {
        "email"
    }
}
