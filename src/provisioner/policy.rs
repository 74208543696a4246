use crate::config::ProvisioningConfig;
use std::time::Duration;

/// Readiness backoff and redelivery window for session provisioning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPolicy {
    /// First delay between readiness checks
    pub min_delay: Duration,
    /// Delays double up to this bound
    pub max_delay: Duration,
    /// Total readiness wait before provisioning fails
    pub timeout: Duration,
    /// Repeated tasks for the same URL inside this window are redeliveries; zero disables the check
    pub redelivery_window: Duration,
}

impl ProvisionPolicy {
    /// Delay to use after `current`
    pub fn next_delay(&self, current: Duration) -> Duration {
        (current * 2).min(self.max_delay)
    }
}

impl Default for ProvisionPolicy {
    fn default() -> Self {
        Self::from(&ProvisioningConfig::default())
    }
}

impl From<&ProvisioningConfig> for ProvisionPolicy {
    fn from(config: &ProvisioningConfig) -> Self {
        Self {
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            timeout: Duration::from_millis(config.timeout_ms),
            redelivery_window: Duration::from_secs(config.redelivery_window_secs),
        }
    }
}
