//! Delivery capability — the transport boundary of the dispatch engine.

pub mod sim;
pub mod smtp;

pub use sim::SimulatedDelivery;
pub use smtp::{SmtpConfig, SmtpDelivery};

use async_trait::async_trait;

use crate::error::DeliveryFailure;

/// Abstract message transport.
///
/// The engine observes only success or failure per recipient; transport,
/// authentication, and protocol-level retries live behind this trait.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Deliver one rendered message to the recipient identified by
    /// `recipient_key`.
    async fn deliver(
        &self,
        subject: &str,
        body: &str,
        recipient_key: &str,
    ) -> Result<(), DeliveryFailure>;
}
