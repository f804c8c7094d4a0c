//! Configuration types.

use std::time::Duration;

use crate::campaign::model::DripInterval;

/// Dispatch engine configuration.
///
/// The engine itself is duration-agnostic: the mapping from a drip interval
/// unit to a wall-clock duration lives here and is supplied by the caller.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on one recipient's delivery; an overrun is recorded as an
    /// errored outcome and the activation continues.
    pub delivery_timeout: Duration,
    /// Wall-clock spacing between hourly drip activations.
    pub hourly_interval: Duration,
    /// Wall-clock spacing between daily drip activations.
    pub daily_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(30),
            hourly_interval: Duration::from_secs(60 * 60),
            daily_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl EngineConfig {
    /// Short intervals for demos and tests.
    pub fn demo() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(5),
            hourly_interval: Duration::from_secs(2),
            daily_interval: Duration::from_secs(5),
        }
    }

    /// Read overrides from `MAILDRIP_*` environment variables, falling back
    /// to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(timeout) = read_secs("MAILDRIP_DELIVERY_TIMEOUT_SECS") {
            config.delivery_timeout = timeout;
        }
        if let Some(interval) = read_secs("MAILDRIP_HOURLY_INTERVAL_SECS") {
            config.hourly_interval = interval;
        }
        if let Some(interval) = read_secs("MAILDRIP_DAILY_INTERVAL_SECS") {
            config.daily_interval = interval;
        }
        config
    }

    /// Wall-clock duration for one drip interval unit.
    pub fn interval(&self, unit: DripInterval) -> Duration {
        match unit {
            DripInterval::Hourly => self.hourly_interval,
            DripInterval::Daily => self.daily_interval,
        }
    }
}

fn read_secs(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_intervals_are_wall_clock() {
        let config = EngineConfig::default();
        assert_eq!(config.interval(DripInterval::Hourly), Duration::from_secs(3600));
        assert_eq!(config.interval(DripInterval::Daily), Duration::from_secs(86400));
    }

    #[test]
    fn demo_intervals_are_short() {
        let config = EngineConfig::demo();
        assert!(config.interval(DripInterval::Hourly) < Duration::from_secs(10));
        assert!(config.interval(DripInterval::Daily) < Duration::from_secs(10));
    }
}
