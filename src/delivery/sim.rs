//! Simulated delivery — configurable failure rate, no network.

use async_trait::async_trait;

use crate::delivery::Delivery;
use crate::error::DeliveryFailure;

/// Delivery stand-in that fails a configurable fraction of sends. Useful for
/// demos and for exercising error accounting without a mail server.
#[derive(Debug, Clone)]
pub struct SimulatedDelivery {
    failure_rate: f64,
}

impl SimulatedDelivery {
    /// `failure_rate` is a probability and is clamped to `0.0..=1.0`.
    pub fn new(failure_rate: f64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }
}

impl Default for SimulatedDelivery {
    fn default() -> Self {
        Self::new(0.05)
    }
}

#[async_trait]
impl Delivery for SimulatedDelivery {
    async fn deliver(
        &self,
        _subject: &str,
        _body: &str,
        recipient_key: &str,
    ) -> Result<(), DeliveryFailure> {
        if rand::random::<f64>() < self.failure_rate {
            return Err(DeliveryFailure::new(format!(
                "Invalid email address: {recipient_key}"
            )));
        }
        Ok(())
    }
}
