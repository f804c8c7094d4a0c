//! SMTP delivery via lettre.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::delivery::Delivery;
use crate::error::DeliveryFailure;

/// SMTP transport configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl SmtpConfig {
    /// Build config from environment variables.
    /// Returns `None` if `MAILDRIP_SMTP_HOST` is not set (SMTP disabled).
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("MAILDRIP_SMTP_HOST").ok()?;

        let port: u16 = std::env::var("MAILDRIP_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let username = std::env::var("MAILDRIP_SMTP_USERNAME").unwrap_or_default();
        let password = std::env::var("MAILDRIP_SMTP_PASSWORD").unwrap_or_default();
        let from_address =
            std::env::var("MAILDRIP_FROM_ADDRESS").unwrap_or_else(|_| username.clone());

        Some(Self {
            host,
            port,
            username,
            password,
            from_address,
        })
    }
}

/// Delivery over SMTP. The recipient key is used as the destination mailbox,
/// so campaigns dispatched through this transport should key recipients by
/// email address; an unparsable key surfaces as a delivery failure.
pub struct SmtpDelivery {
    config: SmtpConfig,
}

impl SmtpDelivery {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    fn send_blocking(
        config: &SmtpConfig,
        subject: &str,
        body: &str,
        to: &str,
    ) -> Result<(), DeliveryFailure> {
        let from: Mailbox = config
            .from_address
            .parse()
            .map_err(|e| DeliveryFailure::new(format!("Invalid from address: {e}")))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| DeliveryFailure::new(format!("Invalid email address: {e}")))?;

        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = SmtpTransport::relay(&config.host)
            .map_err(|e| DeliveryFailure::new(format!("SMTP relay error: {e}")))?
            .port(config.port)
            .credentials(creds)
            .build();

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| DeliveryFailure::new(format!("Failed to build email: {e}")))?;

        transport
            .send(&message)
            .map_err(|e| DeliveryFailure::new(format!("SMTP send error: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl Delivery for SmtpDelivery {
    async fn deliver(
        &self,
        subject: &str,
        body: &str,
        recipient_key: &str,
    ) -> Result<(), DeliveryFailure> {
        let config = self.config.clone();
        let subject = subject.to_string();
        let body = body.to_string();
        let to = recipient_key.to_string();

        tokio::task::spawn_blocking(move || Self::send_blocking(&config, &subject, &body, &to))
            .await
            .map_err(|e| DeliveryFailure::new(format!("Delivery task join error: {e}")))?
    }
}
