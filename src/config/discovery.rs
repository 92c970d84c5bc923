use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_DISCOVERY_ABS_TIMEOUT_MS;
use crate::constants::DEFAULT_DISCOVERY_REL_TIMEOUT;
use crate::Error;
use crate::Result;

/// Listen window of device discovery
///
/// The window is `rel_timeout` subscribe round-trips plus `abs_timeout_in_ms`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DiscoveryConfig {
    /// Window length in units of the measured subscribe round-trip
    /// Default: 3.0
    #[serde(default = "default_rel_timeout")]
    pub rel_timeout: f64,

    /// Additional absolute window length
    /// Default: 100ms
    #[serde(default = "default_abs_timeout_in_ms")]
    pub abs_timeout_in_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            rel_timeout: default_rel_timeout(),
            abs_timeout_in_ms: default_abs_timeout_in_ms(),
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.rel_timeout.is_finite() || self.rel_timeout < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "rel_timeout must be a non-negative number, got {}",
                self.rel_timeout
            )));
        }
        Ok(())
    }

    /// Listen window for a measured subscribe round-trip.
    ///
    /// Saturates at [`Duration::MAX`].
    pub fn window(
        &self,
        subscribe_rtt: Duration,
    ) -> Duration {
        Duration::try_from_secs_f64(subscribe_rtt.as_secs_f64() * self.rel_timeout)
            .unwrap_or(Duration::MAX)
            .saturating_add(Duration::from_millis(self.abs_timeout_in_ms))
    }
}

fn default_rel_timeout() -> f64 {
    DEFAULT_DISCOVERY_REL_TIMEOUT
}
fn default_abs_timeout_in_ms() -> u64 {
    DEFAULT_DISCOVERY_ABS_TIMEOUT_MS
}
